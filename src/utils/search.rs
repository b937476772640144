//! Case-insensitive substring filters shared by post search and the
//! moderation queue.

use sea_orm::sea_query::{Expr, Func, IntoColumnRef, LikeExpr, SimpleExpr};

const ESCAPE: char = '\\';

/// Lower-cased `%query%` with `%`, `_` and the escape char itself escaped.
fn escaped_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.to_lowercase().chars() {
        if matches!(c, '%' | '_' | ESCAPE) {
            pattern.push(ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub fn like_pattern(query: &str) -> LikeExpr {
    LikeExpr::new(escaped_pattern(query)).escape(ESCAPE)
}

/// `lower(column) LIKE '%query%'`; wildcards in `query` match literally.
pub fn contains_ci<C: IntoColumnRef>(column: C, query: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(like_pattern(query))
}

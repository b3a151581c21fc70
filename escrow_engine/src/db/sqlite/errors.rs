/// True when the error is a SQLite UNIQUE constraint violation on the named index/column set.
///
/// SQLite reports the violated columns in the message, e.g. `UNIQUE constraint failed:
/// orders.external_payment_ref`, so callers can tell which constraint lost the race.
pub fn is_unique_violation(e: &sqlx::Error, column: &str) -> bool {
    match e {
        sqlx::Error::Database(db_err) => {
            let msg = db_err.message();
            msg.contains("UNIQUE constraint failed") && msg.contains(column)
        },
        _ => false,
    }
}

use crate::db_types::Order;

/// Outcome of the idempotent order insert for a captured payment. A duplicate webhook delivery is not an error; the
/// caller acknowledges it and takes no further action.
#[derive(Debug, Clone)]
pub enum InsertOrderResult {
    Inserted(Order),
    AlreadyExists(Order),
}

impl InsertOrderResult {
    pub fn order(&self) -> &Order {
        match self {
            InsertOrderResult::Inserted(o) | InsertOrderResult::AlreadyExists(o) => o,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, InsertOrderResult::Inserted(_))
    }
}

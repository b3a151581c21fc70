use rand::{distributions::Alphanumeric, Rng};

/// Generates a human-readable candidate order number, e.g. `MKT-4F7K2P9QXA`.
///
/// Uniqueness is enforced by the `order_number` index; callers retry with a fresh candidate on a collision.
pub fn new_order_number() -> String {
    let suffix: String =
        rand::thread_rng().sample_iter(&Alphanumeric).take(10).map(char::from).collect::<String>().to_uppercase();
    format!("MKT-{suffix}")
}

#[cfg(test)]
mod test {
    use super::new_order_number;

    #[test]
    fn order_number_format() {
        let n = new_order_number();
        assert!(n.starts_with("MKT-"));
        assert_eq!(n.len(), 14);
        assert!(n.chars().skip(4).all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn order_numbers_are_random() {
        assert_ne!(new_order_number(), new_order_number());
    }
}

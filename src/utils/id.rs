use uuid::Uuid;

/// Generate a fresh entity id of the form `<kind>_<32 hex chars>`.
pub fn fresh(kind: &str) -> String {
    format!("{kind}_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_prefixed_and_unique() {
        let a = fresh("chat");
        let b = fresh("chat");
        assert!(a.starts_with("chat_"));
        assert_eq!(a.len(), "chat_".len() + 32);
        assert_ne!(a, b);
    }
}

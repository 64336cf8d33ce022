//! The name-pair value type used as typed-pipeline input.

use std::cmp::Ordering;
use std::fmt;

/// An immutable first-name/last-name pair.
///
/// Equality, hashing and ordering are structural over both fields; there
/// is no identity beyond value equality. Displays as `First Last`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Person {
    first_name: String,
    last_name: String,
}

impl Person {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        }
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Alphabetical ordering by last name, ties broken by first name.
    ///
    /// Suitable for passing straight to `Pipeline::sorted_by`.
    pub fn by_last_then_first(a: &Person, b: &Person) -> Ordering {
        a.last_name
            .cmp(&b.last_name)
            .then_with(|| a.first_name.cmp(&b.first_name))
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_structural() {
        assert_eq!(
            Person::new("Felicity", "Coniston"),
            Person::new("Felicity", "Coniston")
        );
        assert_ne!(
            Person::new("Felicity", "Coniston"),
            Person::new("Felicity", "Hawkshead")
        );
    }

    #[test]
    fn test_display_is_first_then_last() {
        let p = Person::new("Gerald", "Hawkshead");
        assert_eq!(p.to_string(), "Gerald Hawkshead");
    }

    #[test]
    fn test_by_last_then_first_orders_on_last_name() {
        let a = Person::new("Gerald", "Hawkshead");
        let b = Person::new("Felicity", "Coniston");
        assert_eq!(Person::by_last_then_first(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_by_last_then_first_breaks_ties_on_first_name() {
        let a = Person::new("Gerald", "Hawkshead");
        let b = Person::new("Eustace", "Hawkshead");
        assert_eq!(Person::by_last_then_first(&a, &b), Ordering::Greater);
        assert_eq!(Person::by_last_then_first(&b, &a), Ordering::Less);
        assert_eq!(Person::by_last_then_first(&a, &a), Ordering::Equal);
    }
}

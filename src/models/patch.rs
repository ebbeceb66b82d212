use serde::{Deserialize, Deserializer};

/// A single field of a partial update.
///
/// Use with `#[serde(default)]`: a key that is absent from the JSON body stays
/// `Unset`, a key that is present deserializes into `Set`. For nullable fields use
/// `Patch<Option<T>>` so that an explicit `null` becomes `Set(None)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Unset,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Unset
    }
}

impl<T> Patch<T> {
    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Unset => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Patch<U> {
        match self {
            Patch::Set(value) => Patch::Set(f(value)),
            Patch::Unset => Patch::Unset,
        }
    }

    /// Overwrites `target` when set.
    pub fn apply_to(self, target: &mut T) {
        if let Patch::Set(value) = self {
            *target = value;
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Patch::Set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Body {
        #[serde(default)]
        title: Patch<String>,
        #[serde(default)]
        note: Patch<Option<String>>,
    }

    #[test]
    fn test_absent_null_and_present_are_distinct() {
        let body: Body = serde_json::from_str("{}").unwrap();
        assert_eq!(body.title, Patch::Unset);
        assert_eq!(body.note, Patch::Unset);

        let body: Body = serde_json::from_str(r#"{"note": null}"#).unwrap();
        assert_eq!(body.note, Patch::Set(None));

        let body: Body = serde_json::from_str(r#"{"title": "a", "note": "b"}"#).unwrap();
        assert_eq!(body.title, Patch::Set("a".to_string()));
        assert_eq!(body.note, Patch::Set(Some("b".to_string())));
    }

    #[test]
    fn test_null_on_non_nullable_field_is_rejected() {
        assert!(serde_json::from_str::<Body>(r#"{"title": null}"#).is_err());
    }

    #[test]
    fn test_apply_to() {
        let mut value = 1;
        Patch::Unset.apply_to(&mut value);
        assert_eq!(value, 1);
        Patch::Set(5).apply_to(&mut value);
        assert_eq!(value, 5);
    }
}

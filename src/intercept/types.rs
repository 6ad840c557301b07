//! Intercept records and the change stream they travel on.

/// The state of one intercept as seen by consumers of the watch stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterceptRecord {
    /// Stable identifier.
    pub id: String,
    /// Non-empty only when the intercept required authenticated creation.
    pub api_key: String,
    /// Non-empty only when a preview domain was provisioned.
    pub preview_domain: String,
}

impl InterceptRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_preview_domain(mut self, domain: impl Into<String>) -> Self {
        self.preview_domain = domain.into();
        self
    }

    /// Intercepts created with an API key are known to System A.
    pub fn requires_login(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn has_preview_domain(&self) -> bool {
        !self.preview_domain.is_empty()
    }
}

/// One change to one intercept.
///
/// For a deletion, `value` is the record as it was just before removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptUpdate {
    pub value: InterceptRecord,
    pub delete: bool,
}

impl InterceptUpdate {
    pub fn upsert(value: InterceptRecord) -> Self {
        Self {
            value,
            delete: false,
        }
    }

    pub fn deletion(value: InterceptRecord) -> Self {
        Self {
            value,
            delete: true,
        }
    }
}

/// A batch of changes delivered together on the watch stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterceptSnapshot {
    pub updates: Vec<InterceptUpdate>,
}

impl From<Vec<InterceptUpdate>> for InterceptSnapshot {
    fn from(updates: Vec<InterceptUpdate>) -> Self {
        Self { updates }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_fill_every_field() {
        let record = InterceptRecord::new("i1")
            .with_api_key("k1")
            .with_preview_domain("d1.example");

        assert_eq!(
            record,
            InterceptRecord {
                id: "i1".into(),
                api_key: "k1".into(),
                preview_domain: "d1.example".into(),
            }
        );
        assert!(record.requires_login());
        assert!(record.has_preview_domain());
    }

    #[test]
    fn bare_record_is_anonymous() {
        let record = InterceptRecord::new("i2");
        assert!(!record.requires_login());
        assert!(!record.has_preview_domain());
    }
}

//! Options controlling how an `Auto` entry is documented.
//!
//! Every field is optional: `Some` means the user wrote it, `None` means
//! "inherit". Merging overlays only the fields a child set explicitly, so an
//! unset child never clobbers an ancestor's choice with a default.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::objects::Dynamic;

/// How a documented object's name is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureName {
    /// Full dotted path
    Full,
    /// Object name only
    Short,
    /// Path relative to the package
    #[default]
    Relative,
}

/// Where the members of a class or module are placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildrenPolicy {
    /// Rendered inside the parent's page
    #[default]
    Embedded,
    /// Rendered inside the parent's page at a shallower heading level
    Flat,
    /// Each member gets its own page
    Separate,
    /// Members appear only as rows in the parent's summary table
    Linked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberOrder {
    #[default]
    Alphabetical,
    Source,
}

/// A `package` field: absent, explicitly null, or a package name
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PackageOverride {
    /// Field not written; keep the ancestor's package
    #[default]
    Inherit,
    /// `package: null`; resolve names as absolute paths
    Clear,
    Set(String),
}

impl PackageOverride {
    pub fn is_inherit(&self) -> bool {
        matches!(self, PackageOverride::Inherit)
    }

    pub fn set(name: impl Into<String>) -> Self {
        PackageOverride::Set(name.into())
    }

    /// `None` when inheriting, otherwise the package this field selects.
    pub fn resolve(&self) -> Option<Option<&str>> {
        match self {
            PackageOverride::Inherit => None,
            PackageOverride::Clear => Some(None),
            PackageOverride::Set(name) => Some(Some(name.as_str())),
        }
    }

    /// The overriding value, or `parent` when inheriting.
    pub fn or(&self, parent: &PackageOverride) -> PackageOverride {
        match self {
            PackageOverride::Inherit => parent.clone(),
            other => other.clone(),
        }
    }
}

impl Serialize for PackageOverride {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PackageOverride::Inherit | PackageOverride::Clear => serializer.serialize_none(),
            PackageOverride::Set(name) => serializer.serialize_str(name),
        }
    }
}

impl<'de> Deserialize<'de> for PackageOverride {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<String>::deserialize(deserializer)? {
            Some(name) => PackageOverride::Set(name),
            None => PackageOverride::Clear,
        })
    }
}

/// Member selection and presentation options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutoOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_name: Option<SignatureName>,
    /// Explicit member list; bypasses every other member filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_private: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_imports: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_empty: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_inherited: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_attributes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_classes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_functions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic: Option<Dynamic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<ChildrenPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_order: Option<MemberOrder>,
    #[serde(default, skip_serializing_if = "PackageOverride::is_inherit")]
    pub package: PackageOverride,
    /// Options applied to the members of the documented object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_options: Option<Box<AutoOptions>>,
}

impl AutoOptions {
    /// Overlay the fields set on `self` onto `parent`.
    pub fn merge(&self, parent: &AutoOptions) -> AutoOptions {
        AutoOptions {
            signature_name: self.signature_name.or(parent.signature_name),
            members: self.members.clone().or_else(|| parent.members.clone()),
            include_private: self.include_private.or(parent.include_private),
            include_imports: self.include_imports.or(parent.include_imports),
            include_empty: self.include_empty.or(parent.include_empty),
            include_inherited: self.include_inherited.or(parent.include_inherited),
            include_attributes: self.include_attributes.or(parent.include_attributes),
            include_classes: self.include_classes.or(parent.include_classes),
            include_functions: self.include_functions.or(parent.include_functions),
            include: self.include.clone().or_else(|| parent.include.clone()),
            exclude: self.exclude.clone().or_else(|| parent.exclude.clone()),
            dynamic: self.dynamic.clone().or_else(|| parent.dynamic.clone()),
            children: self.children.or(parent.children),
            member_order: self.member_order.or(parent.member_order),
            package: self.package.or(&parent.package),
            member_options: self
                .member_options
                .clone()
                .or_else(|| parent.member_options.clone()),
        }
    }

    /// Whether no field was written.
    pub fn is_empty(&self) -> bool {
        self == &AutoOptions::default()
    }

    pub fn signature_name(&self) -> SignatureName {
        self.signature_name.unwrap_or_default()
    }

    pub fn include_private(&self) -> bool {
        self.include_private.unwrap_or(false)
    }

    pub fn include_imports(&self) -> bool {
        self.include_imports.unwrap_or(false)
    }

    pub fn include_empty(&self) -> bool {
        self.include_empty.unwrap_or(false)
    }

    pub fn include_inherited(&self) -> bool {
        self.include_inherited.unwrap_or(false)
    }

    pub fn include_attributes(&self) -> bool {
        self.include_attributes.unwrap_or(true)
    }

    pub fn include_classes(&self) -> bool {
        self.include_classes.unwrap_or(true)
    }

    pub fn include_functions(&self) -> bool {
        self.include_functions.unwrap_or(true)
    }

    pub fn children(&self) -> ChildrenPolicy {
        self.children.unwrap_or_default()
    }

    pub fn member_order(&self) -> MemberOrder {
        self.member_order.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_parent_fields() {
        let parent = AutoOptions {
            include_private: Some(true),
            children: Some(ChildrenPolicy::Separate),
            ..Default::default()
        };
        let child = AutoOptions {
            children: Some(ChildrenPolicy::Linked),
            ..Default::default()
        };

        let merged = child.merge(&parent);
        assert_eq!(merged.include_private, Some(true));
        assert_eq!(merged.children(), ChildrenPolicy::Linked);
        assert!(!merged.include_empty());
    }

    #[test]
    fn test_explicit_false_overrides_parent() {
        let parent = AutoOptions {
            include_functions: Some(true),
            ..Default::default()
        };
        let child: AutoOptions =
            serde_json::from_value(serde_json::json!({"include_functions": false})).unwrap();

        assert!(!child.merge(&parent).include_functions());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = serde_json::from_value::<AutoOptions>(serde_json::json!({"childrn": "separate"}))
            .unwrap_err();
        assert!(err.to_string().contains("unknown field `childrn`"));
    }

    #[test]
    fn test_unsupported_enum_value() {
        let err =
            serde_json::from_value::<AutoOptions>(serde_json::json!({"member_order": "random"}))
                .unwrap_err();
        assert!(err.to_string().contains("random"));
    }

    #[test]
    fn test_package_override_states() {
        let set: AutoOptions = serde_json::from_value(serde_json::json!({"package": "pkg"})).unwrap();
        let cleared: AutoOptions =
            serde_json::from_value(serde_json::json!({"package": null})).unwrap();
        let absent = AutoOptions::default();

        assert_eq!(set.package, PackageOverride::set("pkg"));
        assert_eq!(cleared.package, PackageOverride::Clear);
        assert!(absent.package.is_inherit());
        assert_eq!(absent.package.or(&set.package), set.package);
    }
}

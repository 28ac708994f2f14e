//! Operation catalog.
//!
//! Maps `operationId`s from an OpenAPI-style document to the HTTP method and
//! path template needed to call them. The catalog is built once, by an
//! explicit call, and is read-only afterwards.
//!
//! Only `paths.<template>.<method>.operationId` is read, plus the
//! `x-message-level-encryption` extension flag. Schemas are left to the remote
//! service.
//!
//! # Examples
//!
//! ```
//! use vop_client::catalog::{Operation, OperationCatalog};
//!
//! let catalog = OperationCatalog::bundled()?;
//! let spec = catalog.resolve(Operation::EnrollUser.as_str())?;
//! assert_eq!(spec.method, reqwest::Method::POST);
//! assert_eq!(spec.path, "/vop/v1/users/enroll");
//!
//! assert!(catalog.resolve("Users_Teleport").is_err());
//! # Ok::<(), vop_client::error::VopError>(())
//! ```

use std::collections::HashMap;

use reqwest::Method;
use serde_json::Value;

use crate::{
    error::{Result, VopError},
    transport::join_url,
};

mod operation;

pub use operation::Operation;

/// Bundled Visa Offers Platform user catalog.
pub const BUNDLED_CATALOG: &str = include_str!("../../catalog/vop.openapi.json");

/// Operation-level extension that marks an operation as requiring MLE.
pub const MLE_EXTENSION: &str = "x-message-level-encryption";

/// Path-item keys that are not operations.
const PATH_ITEM_FIELDS: [&str; 5] = ["summary", "description", "servers", "parameters", "$ref"];

/// One resolvable operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSpec {
    /// Catalog `operationId`.
    pub operation_id: String,
    /// HTTP method.
    pub method: Method,
    /// Path template, e.g. `/vop/v1/users/{userKey}`.
    pub path: String,
    /// Whether the body must be wrapped in an MLE envelope.
    pub requires_encryption: bool,
}

impl OperationSpec {
    /// Fills the path template and joins it onto `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`VopError::ConfigurationError`] if a placeholder has no value,
    /// or a value would change the path structure: it is empty, `.` or `..`,
    /// or it contains `/`, `\`, `?` or `#`.
    pub fn bind(&self, base_url: &str, path_params: &[(String, String)]) -> Result<String> {
        let mut path = self.path.clone();
        for (name, value) in path_params {
            if matches!(value.as_str(), "" | "." | "..") {
                return Err(VopError::ConfigurationError(format!(
                    "path parameter `{name}` of {} is not a valid path segment",
                    self.operation_id
                )));
            }
            if value.contains(['/', '\\', '?', '#']) {
                return Err(VopError::ConfigurationError(format!(
                    "path parameter `{name}` of {} contains a reserved character",
                    self.operation_id
                )));
            }
            path = path.replace(&format!("{{{name}}}"), value);
        }

        if let Some(start) = path.find('{') {
            let placeholder = path[start..].split_inclusive('}').next().unwrap_or(&path[start..]);
            return Err(VopError::ConfigurationError(format!(
                "missing path parameter {placeholder} for {}",
                self.operation_id
            )));
        }

        Ok(join_url(base_url, &path))
    }
}

/// Static map from `operationId` to [`OperationSpec`].
#[derive(Debug, Clone, Default)]
pub struct OperationCatalog {
    operations: HashMap<String, OperationSpec>,
}

impl OperationCatalog {
    /// Parses the bundled catalog.
    ///
    /// # Errors
    ///
    /// Returns [`VopError::ConfigurationError`] if the bundled document is
    /// invalid, which only happens if the build shipped a broken file.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_CATALOG)
    }

    /// Parses an OpenAPI-style document.
    ///
    /// # Errors
    ///
    /// Returns [`VopError::ConfigurationError`] if:
    /// - the document is not JSON or has no `paths` object
    /// - a path item has a key that is neither an HTTP method nor a known field
    /// - a path template contains `..` or `//`
    /// - two operations share an `operationId`
    pub fn from_json(document: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(document)
            .map_err(|e| VopError::ConfigurationError(format!("invalid catalog JSON: {e}")))?;

        let paths = document.get("paths").and_then(Value::as_object).ok_or_else(|| {
            VopError::ConfigurationError("catalog has no `paths` object".to_owned())
        })?;

        let mut operations = HashMap::new();
        for (template, item) in paths {
            validate_template(template)?;

            let item = item.as_object().ok_or_else(|| {
                VopError::ConfigurationError(format!("path item {template} is not an object"))
            })?;

            for (key, operation) in item {
                if PATH_ITEM_FIELDS.contains(&key.as_str()) || key.starts_with("x-") {
                    continue;
                }
                let method = parse_method(template, key)?;

                let Some(operation_id) = operation.get("operationId").and_then(Value::as_str)
                else {
                    continue;
                };

                let requires_encryption =
                    operation.get(MLE_EXTENSION).and_then(Value::as_bool).unwrap_or(false);

                let spec = OperationSpec {
                    operation_id: operation_id.to_owned(),
                    method,
                    path: template.clone(),
                    requires_encryption,
                };

                if operations.insert(operation_id.to_owned(), spec).is_some() {
                    return Err(VopError::ConfigurationError(format!(
                        "duplicate operationId in catalog: {operation_id}"
                    )));
                }
            }
        }

        Ok(Self { operations })
    }

    /// Looks up an operation by id.
    ///
    /// # Errors
    ///
    /// Returns [`VopError::ConfigurationError`] with `Invalid operationId: <id>`
    /// if the catalog has no such operation.
    pub fn resolve(&self, operation_id: &str) -> Result<&OperationSpec> {
        self.operations
            .get(operation_id)
            .ok_or_else(|| VopError::ConfigurationError(format!("Invalid operationId: {operation_id}")))
    }

    /// Returns the number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns `true` if the catalog has no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Iterates over all operations in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &OperationSpec> {
        self.operations.values()
    }
}

fn parse_method(template: &str, key: &str) -> Result<Method> {
    match key {
        "get" => Ok(Method::GET),
        "put" => Ok(Method::PUT),
        "post" => Ok(Method::POST),
        "delete" => Ok(Method::DELETE),
        "options" => Ok(Method::OPTIONS),
        "head" => Ok(Method::HEAD),
        "patch" => Ok(Method::PATCH),
        "trace" => Ok(Method::TRACE),
        other => Err(VopError::ConfigurationError(format!(
            "unknown HTTP method `{other}` under {template}"
        ))),
    }
}

fn validate_template(template: &str) -> Result<()> {
    if template.contains("..") {
        return Err(VopError::ConfigurationError(format!(
            "path {template} contains traversal sequence '..'"
        )));
    }
    if template.contains("//") {
        return Err(VopError::ConfigurationError(format!(
            "path {template} contains double slash '//'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_covers_every_operation() {
        let catalog = OperationCatalog::bundled().unwrap();
        assert_eq!(catalog.len(), Operation::ALL.len());

        for op in Operation::ALL {
            let spec = catalog.resolve(op.as_str()).unwrap();
            assert_eq!(spec.method, Method::POST);
            assert!(spec.path.starts_with("/vop/v1/users/"));
            assert!(!spec.requires_encryption);
        }
    }

    #[test]
    fn test_resolve_unknown() {
        let catalog = OperationCatalog::bundled().unwrap();
        let err = catalog.resolve("Users_Teleport").unwrap_err();
        assert!(matches!(err, VopError::ConfigurationError(_)));
        assert!(err.to_string().contains("Invalid operationId: Users_Teleport"));
    }

    #[test]
    fn test_from_json_reads_methods_and_mle_flag() {
        let catalog = OperationCatalog::from_json(
            r#"{
                "paths": {
                    "/users/{userKey}": {
                        "parameters": [],
                        "get": { "operationId": "GetOne" },
                        "delete": { "operationId": "DeleteOne", "x-message-level-encryption": true },
                        "x-internal": true
                    },
                    "/health": { "get": { "summary": "no operation id" } }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.resolve("GetOne").unwrap().method, Method::GET);
        let delete = catalog.resolve("DeleteOne").unwrap();
        assert_eq!(delete.method, Method::DELETE);
        assert!(delete.requires_encryption);
    }

    #[test]
    fn test_from_json_rejects_duplicates() {
        let err = OperationCatalog::from_json(
            r#"{"paths": {
                "/a": { "get": { "operationId": "Same" } },
                "/b": { "post": { "operationId": "Same" } }
            }}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate operationId"));
    }

    #[test]
    fn test_from_json_rejects_unknown_method() {
        let err =
            OperationCatalog::from_json(r#"{"paths": {"/a": {"fetch": {"operationId": "A"}}}}"#)
                .unwrap_err();
        assert!(err.to_string().contains("unknown HTTP method `fetch`"));
    }

    #[test]
    fn test_from_json_rejects_bad_documents() {
        assert!(OperationCatalog::from_json("not json").is_err());
        assert!(OperationCatalog::from_json("{}").is_err());
        assert!(OperationCatalog::from_json(r#"{"paths": {"/../etc": {}}}"#).is_err());
        assert!(OperationCatalog::from_json(r#"{"paths": {"/a//b": {}}}"#).is_err());
    }

    #[test]
    fn test_bind_fills_template() {
        let spec = OperationSpec {
            operation_id: "GetOne".to_owned(),
            method: Method::GET,
            path: "/users/{userKey}/cards/{cardId}".to_owned(),
            requires_encryption: false,
        };

        let url = spec
            .bind(
                "https://sandbox.api.visa.com/",
                &[("userKey".to_owned(), "u-1".to_owned()), ("cardId".to_owned(), "c-9".to_owned())],
            )
            .unwrap();
        assert_eq!(url, "https://sandbox.api.visa.com/users/u-1/cards/c-9");
    }

    #[test]
    fn test_bind_missing_placeholder() {
        let spec = OperationSpec {
            operation_id: "GetOne".to_owned(),
            method: Method::GET,
            path: "/users/{userKey}".to_owned(),
            requires_encryption: false,
        };

        let err = spec.bind("https://a.com", &[]).unwrap_err();
        assert!(err.to_string().contains("{userKey}"));

        let err = spec
            .bind("https://a.com", &[("userKey".to_owned(), "../admin".to_owned())])
            .unwrap_err();
        assert!(err.to_string().contains("reserved character"));
    }

    #[test]
    fn test_bind_rejects_dot_segments() {
        let spec = OperationSpec {
            operation_id: "ListCards".to_owned(),
            method: Method::GET,
            path: "/vop/v1/users/{userKey}/cards".to_owned(),
            requires_encryption: false,
        };

        for value in ["..", ".", ""] {
            let err = spec
                .bind("https://a.com", &[("userKey".to_owned(), value.to_owned())])
                .unwrap_err();
            assert!(matches!(err, VopError::ConfigurationError(_)), "{value:?} should be rejected");
        }

        let err = spec
            .bind("https://a.com", &[("userKey".to_owned(), "..\\admin".to_owned())])
            .unwrap_err();
        assert!(err.to_string().contains("reserved character"));

        let url =
            spec.bind("https://a.com", &[("userKey".to_owned(), "u..1".to_owned())]).unwrap();
        assert_eq!(url, "https://a.com/vop/v1/users/u..1/cards");
    }
}

//! PDF actions
//!
//! A closed tagged union keyed on `type`. Any action may chain a follow-up
//! through `subAction`; the chain is owned, so a decoded chain always ends.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::validate::{ensure_not_empty, FieldPath, Validate, ValidationResult};

/// An action with its optional follow-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAction")]
pub struct Action {
    #[serde(flatten)]
    pub kind: ActionKind,
    #[serde(rename = "subAction", skip_serializing_if = "Option::is_none")]
    pub sub_action: Option<Box<Action>>,
    /// Members this crate does not know, kept for re-encoding
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawAction {
    #[serde(flatten)]
    kind: ActionKind,
    #[serde(rename = "subAction")]
    sub_action: Option<Box<Action>>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl From<RawAction> for Action {
    fn from(raw: RawAction) -> Self {
        // The tagged kind reads its members without consuming them.
        let mut extra = raw.rest;
        if let Ok(Value::Object(known)) = serde_json::to_value(&raw.kind) {
            for key in known.keys() {
                extra.remove(key);
            }
        }
        extra.remove("type");
        Self {
            kind: raw.kind,
            sub_action: raw.sub_action,
            extra,
        }
    }
}

/// Variant-specific action data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActionKind {
    GoTo {
        #[serde(rename = "pageIndex")]
        page_index: u32,
    },
    GoToRemote {
        #[serde(rename = "relativePath")]
        relative_path: String,
        #[serde(rename = "namedDestination")]
        named_destination: String,
    },
    GoToEmbedded {
        #[serde(rename = "newWindow")]
        new_window: bool,
        #[serde(rename = "relativePath")]
        relative_path: String,
        #[serde(rename = "targetType")]
        target_type: EmbeddedTarget,
    },
    Launch {
        #[serde(rename = "filePath")]
        file_path: String,
    },
    Uri {
        uri: String,
    },
    Hide {
        hide: bool,
        #[serde(rename = "annotationReferences")]
        annotation_references: Vec<AnnotationReference>,
    },
    JavaScript {
        script: String,
    },
    SubmitForm {
        uri: String,
        flags: Vec<SubmitFormFlag>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fields: Option<Vec<AnnotationReference>>,
    },
    ResetForm {
        #[serde(skip_serializing_if = "Option::is_none")]
        flags: Option<ResetFormFlag>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fields: Option<Vec<AnnotationReference>>,
    },
    Named {
        action: NamedAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddedTarget {
    Parent,
    Child,
}

/// Reference to a form field or annotation targeted by hide/submit/reset
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnnotationReference {
    #[serde(rename = "fieldName", skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(rename = "pdfObjectId", skip_serializing_if = "Option::is_none")]
    pub pdf_object_id: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Submit-form flags; combinations are the caller's responsibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmitFormFlag {
    IncludeExclude,
    IncludeNoValueFields,
    ExportFormat,
    GetMethod,
    SubmitCoordinated,
    Xfdf,
    IncludeAppendSaves,
    IncludeAnnotations,
    #[serde(rename = "submitPDF")]
    SubmitPdf,
    CanonicalFormat,
    ExcludeNonUserAnnotations,
    #[serde(rename = "excludeFKey")]
    ExcludeFKey,
    EmbedForm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResetFormFlag {
    IncludeExclude,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NamedAction {
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    GoBack,
    GoForward,
    GoToPage,
    Find,
    Print,
    Outline,
    Search,
    Brightness,
    ZoomIn,
    ZoomOut,
    SaveAs,
    Info,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            sub_action: None,
            extra: Map::new(),
        }
    }

    pub fn go_to(page_index: u32) -> Self {
        Self::new(ActionKind::GoTo { page_index })
    }

    pub fn uri(uri: &str) -> Self {
        Self::new(ActionKind::Uri {
            uri: uri.to_string(),
        })
    }

    /// Append `next` at the end of this action's chain
    pub fn then(mut self, next: Action) -> Self {
        let mut slot = &mut self.sub_action;
        while let Some(action) = slot {
            slot = &mut action.sub_action;
        }
        *slot = Some(Box::new(next));
        self
    }

    /// Walk the chain starting with this action
    pub fn chain(&self) -> ActionChain<'_> {
        ActionChain { next: Some(self) }
    }

    /// Wire name of the discriminant
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ActionKind::GoTo { .. } => "goTo",
            ActionKind::GoToRemote { .. } => "goToRemote",
            ActionKind::GoToEmbedded { .. } => "goToEmbedded",
            ActionKind::Launch { .. } => "launch",
            ActionKind::Uri { .. } => "uri",
            ActionKind::Hide { .. } => "hide",
            ActionKind::JavaScript { .. } => "javaScript",
            ActionKind::SubmitForm { .. } => "submitForm",
            ActionKind::ResetForm { .. } => "resetForm",
            ActionKind::Named { .. } => "named",
        }
    }
}

/// Iterator over an action and its chained sub-actions
pub struct ActionChain<'a> {
    next: Option<&'a Action>,
}

impl<'a> Iterator for ActionChain<'a> {
    type Item = &'a Action;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.sub_action.as_deref();
        Some(current)
    }
}

impl Validate for ActionKind {
    fn validate_at(&self, path: &FieldPath) -> ValidationResult {
        match self {
            ActionKind::GoToRemote { relative_path, .. }
            | ActionKind::GoToEmbedded { relative_path, .. } => {
                ensure_not_empty(relative_path, &path.field("relativePath"))
            }
            ActionKind::Launch { file_path } => ensure_not_empty(file_path, &path.field("filePath")),
            ActionKind::Uri { uri } => ensure_not_empty(uri, &path.field("uri")),
            ActionKind::SubmitForm { uri, .. } => ensure_not_empty(uri, &path.field("uri")),
            _ => Ok(()),
        }
    }
}

impl Validate for Action {
    // Iterative so a long chain cannot exhaust the stack.
    fn validate_at(&self, path: &FieldPath) -> ValidationResult {
        let mut current_path = path.clone();
        for action in self.chain() {
            action.kind.validate_at(&current_path)?;
            current_path = current_path.field("subAction");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_go_to_with_chain() {
        let payload = json!({
            "type": "goTo",
            "pageIndex": 3,
            "subAction": { "type": "uri", "uri": "https://example.com" }
        });
        let action: Action = serde_json::from_value(payload.clone()).unwrap();

        assert_eq!(action.kind, ActionKind::GoTo { page_index: 3 });
        assert_eq!(action.chain().count(), 2);
        assert_eq!(serde_json::to_value(&action).unwrap(), payload);
    }

    #[test]
    fn test_unknown_action_type_rejected() {
        let result: Result<Action, _> =
            serde_json::from_value(json!({ "type": "teleport", "pageIndex": 1 }));
        assert!(result.is_err());
    }

    #[test]
    fn test_then_appends_to_end_of_chain() {
        let action = Action::go_to(1)
            .then(Action::uri("https://a.example"))
            .then(Action::go_to(2));
        let names: Vec<_> = action.chain().map(|a| a.type_name()).collect();
        assert_eq!(names, vec!["goTo", "uri", "goTo"]);
    }

    #[test]
    fn test_chain_validation_reports_depth() {
        let action = Action::go_to(0).then(Action::go_to(1)).then(Action::uri(""));
        let err = action
            .validate_at(&FieldPath::root().field("action"))
            .unwrap_err();
        assert_eq!(err.path.to_string(), "action.subAction.subAction.uri");
    }

    #[test]
    fn test_submit_form_flags_round_trip() {
        let payload = json!({
            "type": "submitForm",
            "uri": "https://forms.example/submit",
            "flags": ["includeExclude", "exportFormat", "submitPDF", "excludeFKey"]
        });
        let action: Action = serde_json::from_value(payload.clone()).unwrap();
        assert!(action.validate().is_ok());
        assert_eq!(serde_json::to_value(&action).unwrap(), payload);
    }

    #[test]
    fn test_named_and_hide_actions() {
        let named: Action =
            serde_json::from_value(json!({ "type": "named", "action": "zoomIn" })).unwrap();
        assert_eq!(
            named.kind,
            ActionKind::Named {
                action: NamedAction::ZoomIn
            }
        );

        let hide: Action = serde_json::from_value(json!({
            "type": "hide",
            "hide": true,
            "annotationReferences": [{ "fieldName": "signature" }, { "pdfObjectId": 42 }]
        }))
        .unwrap();
        match hide.kind {
            ActionKind::Hide {
                annotation_references,
                ..
            } => assert_eq!(annotation_references.len(), 2),
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_unknown_members_survive_the_chain() {
        let payload = json!({
            "type": "goTo",
            "pageIndex": 1,
            "futureFlag": true,
            "subAction": {
                "type": "hide",
                "hide": false,
                "annotationReferences": [{ "fieldName": "total", "widgetHint": "sum" }],
                "transition": "fade"
            }
        });
        let action: Action = serde_json::from_value(payload.clone()).unwrap();

        assert_eq!(action.extra.get("futureFlag"), Some(&json!(true)));
        assert!(!action.extra.contains_key("pageIndex"));
        assert!(!action.extra.contains_key("type"));
        let follow_up = action.sub_action.as_deref().unwrap();
        assert_eq!(follow_up.extra.len(), 1);
        assert_eq!(follow_up.extra.get("transition"), Some(&json!("fade")));

        assert_eq!(serde_json::to_value(&action).unwrap(), payload);
    }
}

use ::config::ConfigError;

use super::*;

#[test]
fn test_error_fatal() {
    let err = Error::Fatal("registry corrupted".to_string());
    assert_eq!(err.to_string(), "Fatal error: registry corrupted");
}

#[test]
fn test_config_shorthand_wraps_message() {
    let err = Error::config("group_by_keys must not be empty");
    assert!(matches!(err, Error::Config(ConfigError::Message(_))));
    assert!(err.to_string().contains("group_by_keys"));
}

#[test]
fn test_action_error_unknown_action() {
    let err = ActionError::UnknownAction("histogram".to_string());
    assert_eq!(err.to_string(), "Unknown aggregate action: histogram");
}

#[test]
fn test_action_error_invalid_settings() {
    let err = ActionError::InvalidSettings {
        action: "count".to_string(),
        reason: "unknown field `cnt`".to_string(),
    };
    let msg = err.to_string();
    assert!(msg.contains("count"));
    assert!(msg.contains("cnt"));
}

#[test]
fn test_action_error_converts_into_config_error() {
    let err: Error = ActionError::UnknownAction("histogram".to_string()).into();
    assert!(matches!(err, Error::Config(ConfigError::Foreign(_))));
    assert!(err.to_string().contains("histogram"));
}

#[test]
fn test_expression_error_evaluation() {
    let err: Error = ExpressionError::Evaluation {
        expression: "/status == 200".to_string(),
        reason: "status is not a number".to_string(),
    }
    .into();
    let msg = err.to_string();
    assert!(msg.contains("/status == 200"));
    assert!(msg.contains("not a number"));
}

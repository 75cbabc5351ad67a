use chrono::{TimeZone, Utc};
use serde_json::json;
use travel_order_portal::{
    error::ApiError,
    models::{
        AddUserRequest, LoginRequest, ReviewAction, ReviewRequest, Role, SettingsRequest,
        TravelOrder, TravelOrderStatus, TravelOrderView, User, UserProfile,
        generate_travel_order_code,
    },
};
use uuid::Uuid;
use validator::Validate;

fn first_error<T: Validate>(value: &T) -> String {
    let errors = value.validate().expect_err("expected validation errors");
    ApiError::from(errors).to_string()
}

// --- Roles ---

#[test]
fn test_role_parse_is_exact() {
    for role in Role::ALL {
        assert_eq!(Role::parse(role.as_str()), Some(role));
    }
    assert_eq!(Role::parse("admin"), None);
    assert_eq!(Role::parse(" ADMIN"), None);
    assert_eq!(Role::parse(""), None);
}

#[test]
fn test_role_serializes_uppercase() {
    assert_eq!(serde_json::to_value(Role::Signatory).unwrap(), json!("SIGNATORY"));
    let role: Role = serde_json::from_value(json!("CLIENT")).unwrap();
    assert_eq!(role, Role::Client);
    assert!(serde_json::from_value::<Role>(json!("client")).is_err());
}

#[test]
fn test_user_profile_rejects_unknown_role() {
    let user = User {
        id: Uuid::new_v4(),
        role: "AUDITOR".to_string(),
        ..Default::default()
    };
    assert!(UserProfile::try_from(user).is_err());

    let user = User {
        role: "ADMIN".to_string(),
        ..Default::default()
    };
    assert_eq!(UserProfile::try_from(user).unwrap().role, Role::Admin);
}

// --- Travel Orders ---

#[test]
fn test_travel_order_code_format() {
    let now = Utc.with_ymd_and_hms(2025, 3, 7, 9, 30, 0).unwrap();
    assert_eq!(generate_travel_order_code(now, [0, 25]), "TO-07-03-25-AZ");
    assert_eq!(generate_travel_order_code(now, [26, 255]), "TO-07-03-25-AV");
}

#[test]
fn test_review_transitions() {
    let pending = TravelOrder::default();
    assert_eq!(pending.status(), TravelOrderStatus::Pending);

    let after = pending.review(ReviewAction::Approve).unwrap();
    assert!(after.recommending && !after.final_approval && !after.disapproved);

    let recommended = TravelOrder {
        is_recommending_approval_signed: true,
        ..Default::default()
    };
    assert_eq!(recommended.status(), TravelOrderStatus::Recommended);
    let after = recommended.review(ReviewAction::Approve).unwrap();
    assert!(after.recommending && after.final_approval);

    let after = recommended.review(ReviewAction::Disapprove).unwrap();
    assert!(after.disapproved);
    assert!(after.recommending);
}

#[test]
fn test_closed_orders_cannot_be_reviewed() {
    let approved = TravelOrder {
        is_recommending_approval_signed: true,
        is_final_approval_signed: true,
        ..Default::default()
    };
    let disapproved = TravelOrder {
        is_disapproved: true,
        ..Default::default()
    };
    for order in [approved, disapproved] {
        assert!(order.review(ReviewAction::Approve).is_none());
        assert!(order.review(ReviewAction::Disapprove).is_none());
    }
}

#[test]
fn test_travel_order_view_flattens_order() {
    let order = TravelOrder {
        code: "TO-07-03-25-AZ".to_string(),
        ..Default::default()
    };
    let value = serde_json::to_value(TravelOrderView::from(order)).unwrap();
    assert_eq!(value["code"], "TO-07-03-25-AZ");
    assert_eq!(value["status"], "pending");
}

#[test]
fn test_review_request_uses_snake_case_actions() {
    let req: ReviewRequest = serde_json::from_value(json!({ "action": "disapprove" })).unwrap();
    assert_eq!(req.action, ReviewAction::Disapprove);
    assert!(serde_json::from_value::<ReviewRequest>(json!({ "action": "sign" })).is_err());
}

// --- Request Validation ---

#[test]
fn test_login_request_validation() {
    let req = LoginRequest {
        email: "not-an-email".to_string(),
        password: "x".to_string(),
    };
    assert_eq!(first_error(&req), "Email is required.");

    let req = LoginRequest {
        email: "a@b.ph".to_string(),
        password: String::new(),
    };
    assert_eq!(first_error(&req), "Password is required.");
}

#[test]
fn test_add_user_request_validation() {
    let req = AddUserRequest {
        name: "Jo".to_string(),
        email: "jo@deped.gov.ph".to_string(),
        password: "welcome1".to_string(),
        station_id: Uuid::new_v4(),
        role: Role::Client,
        position_designation: "Administrative Officer I".to_string(),
        signature: None,
    };
    assert_eq!(first_error(&req), "Name must be at least 5 characters");
}

#[test]
fn test_settings_request_password_pair() {
    let only_old = SettingsRequest {
        password: Some("current1".to_string()),
        ..Default::default()
    };
    assert_eq!(first_error(&only_old), "New password is required!");

    let neither = SettingsRequest {
        name: Some("New Name".to_string()),
        ..Default::default()
    };
    assert!(neither.validate().is_ok());
}

#[test]
fn test_settings_request_omits_absent_fields() {
    let value = serde_json::to_value(SettingsRequest {
        name: Some("N".to_string()),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(value, json!({ "name": "N" }));
}

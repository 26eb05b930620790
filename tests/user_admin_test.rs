mod common;

use assert_matches::assert_matches;
use common::{TestApp, PASSWORD};
use inventory_desk::{
    entities::UserRole,
    errors::ServiceError,
    services::{
        checkouts::{CheckIn, NewCheckout},
        users::{NewUser, UserUpdate},
    },
};

#[tokio::test]
async fn usernames_and_emails_are_unique() {
    let app = TestApp::new().await;
    app.user("amira", UserRole::Staff).await;
    let users = &app.state.services.users;

    let err = users
        .create(NewUser {
            username: "amira".into(),
            email: "someone@example.com".into(),
            password: PASSWORD.into(),
            role: UserRole::Guest,
        })
        .await
        .unwrap_err();
    assert_eq!(err.response_message(), "Username already taken. Please choose another.");

    let err = users
        .create(NewUser {
            username: "amira2".into(),
            email: "AMIRA@example.com".into(),
            password: PASSWORD.into(),
            role: UserRole::Guest,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::FieldInvalid { field, .. } if field == "email");

    let err = users
        .create(NewUser {
            username: "short".into(),
            email: "short@example.com".into(),
            password: "abc".into(),
            role: UserRole::Guest,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::FieldInvalid { field, .. } if field == "password");
}

#[tokio::test]
async fn authentication_checks_password_and_activity() {
    let app = TestApp::new().await;
    let admin = app.user("root", UserRole::Admin).await;
    let staff = app.user("amira", UserRole::Staff).await;
    let users = &app.state.services.users;

    let signed_in = users.authenticate("amira", PASSWORD).await.unwrap();
    assert!(signed_in.last_seen.is_some());

    assert_matches!(
        users.authenticate("amira", "wrong-password").await,
        Err(ServiceError::Unauthorized(_))
    );
    assert_matches!(
        users.authenticate("nobody", PASSWORD).await,
        Err(ServiceError::Unauthorized(_))
    );

    users.deactivate(admin.id, staff.id).await.unwrap();
    assert_matches!(
        users.authenticate("amira", PASSWORD).await,
        Err(ServiceError::Forbidden(_))
    );
    assert_eq!(users.list_active().await.unwrap().len(), 1);

    users.reactivate(staff.id).await.unwrap();
    assert!(users.authenticate("amira", PASSWORD).await.is_ok());
}

#[tokio::test]
async fn admins_cannot_remove_themselves() {
    let app = TestApp::new().await;
    let admin = app.user("root", UserRole::Admin).await;
    let users = &app.state.services.users;

    let err = users.deactivate(admin.id, admin.id).await.unwrap_err();
    assert_eq!(err.response_message(), "You can't deactivate your own account.");
    let err = users.delete(admin.id, admin.id).await.unwrap_err();
    assert_eq!(err.response_message(), "You can't delete your own account.");
    assert!(users.get(admin.id).await.unwrap().is_active);
}

#[tokio::test]
async fn delete_waits_for_open_checkouts() {
    let app = TestApp::new().await;
    let admin = app.user("root", UserRole::Admin).await;
    let staff = app.user("amira", UserRole::Staff).await;
    let laptop = app.asset("Laptop 7", "LT-007", "Laptop").await;
    let checkouts = &app.state.services.checkouts;
    let users = &app.state.services.users;

    let loan = checkouts
        .check_out(NewCheckout {
            asset_id: laptop.id,
            user_id: staff.id,
            expected_return: None,
            condition_out: "Good".into(),
            notes: None,
        })
        .await
        .unwrap();

    let err = users.delete(admin.id, staff.id).await.unwrap_err();
    assert_eq!(
        err.response_message(),
        "amira still has 1 asset(s) checked out; check them in first."
    );

    checkouts
        .check_in(
            loan.id,
            CheckIn {
                condition_in: "Good".into(),
                notes: None,
            },
        )
        .await
        .unwrap();
    let removed = users.delete(admin.id, staff.id).await.unwrap();
    assert_eq!(removed.username, "amira");
    assert!(users.find_by_id(staff.id).await.unwrap().is_none());
    assert_eq!(checkouts.history(1, 20).await.unwrap().total, 0);
}

#[tokio::test]
async fn update_keeps_password_unless_given() {
    let app = TestApp::new().await;
    let staff = app.user("amira", UserRole::Staff).await;
    let users = &app.state.services.users;

    let updated = users
        .update(
            staff.id,
            UserUpdate {
                username: "amira.k".into(),
                email: "amira.k@example.com".into(),
                password: None,
                role: UserRole::Admin,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.role, UserRole::Admin);
    assert!(users.authenticate("amira.k", PASSWORD).await.is_ok());

    users
        .update(
            staff.id,
            UserUpdate {
                username: "amira.k".into(),
                email: "amira.k@example.com".into(),
                password: Some("a-new-secret".into()),
                role: UserRole::Admin,
            },
        )
        .await
        .unwrap();
    assert!(users.authenticate("amira.k", PASSWORD).await.is_err());
    assert!(users.authenticate("amira.k", "a-new-secret").await.is_ok());
}

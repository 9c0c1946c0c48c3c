//! Session state machine behavior against scripted codecs.


use mercury_rs::{AccessLevel, ArrayNumber, ErrorKind, ReadOp, Session, SessionState};
use mock_support::MockMercury236;

#[tokio::test]
async fn test_happy_path_lifecycle() {
    let mut codec = MockMercury236::ok();
    let mut session = Session::new(&mut codec, 101);
    assert_eq!(session.state(), SessionState::Disconnected);

    session.connect().await.unwrap();
    assert_eq!(session.state(), SessionState::Connected);

    session
        .authenticate(AccessLevel::User, Some("654321"))
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::Authenticated);

    let metrics = session
        .read(ReadOp::EnergyTotal(ArrayNumber::SinceReset))
        .await
        .unwrap();
    assert_eq!(metrics[0].0, "A+");

    session.close().await;
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(codec.seen_password.as_deref(), Some("654321"));
    assert_eq!(codec.count("close_channel"), 1);
}

#[tokio::test]
async fn test_connect_failure_is_connection_error() {
    // Even a timeout during check-connect classifies as a connection error
    let mut codec = MockMercury236::failing("check_connect", ErrorKind::Timeout);
    let mut session = Session::new(&mut codec, 101);

    let err = session.connect().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(session.state(), SessionState::Failed);

    // Never connected, so close sends nothing
    session.close().await;
    assert_eq!(codec.calls, vec!["check_connect"]);
}

#[tokio::test]
async fn test_authenticate_failure_is_authentication_error() {
    let mut codec = MockMercury236::failing("open_channel", ErrorKind::Timeout);
    let mut session = Session::new(&mut codec, 101);

    session.connect().await.unwrap();
    let err = session
        .authenticate(AccessLevel::Admin, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(session.state(), SessionState::Failed);

    // The session got past connect, so close is still attempted
    session.close().await;
    assert_eq!(codec.count("close_channel"), 1);
}

#[tokio::test]
async fn test_default_credentials_per_access_level() {
    let mut codec = MockMercury236::ok();
    let mut session = Session::new(&mut codec, 101);
    session.connect().await.unwrap();
    session.authenticate(AccessLevel::User, None).await.unwrap();
    assert_eq!(codec.seen_password.as_deref(), Some("111111"));

    let mut codec = MockMercury236::ok();
    let mut session = Session::new(&mut codec, 101);
    session.connect().await.unwrap();
    session.authenticate(AccessLevel::Admin, None).await.unwrap();
    assert_eq!(codec.seen_password.as_deref(), Some("222222"));
}

#[tokio::test]
async fn test_read_failure_keeps_session_authenticated() {
    let mut codec = MockMercury236::failing("read_energy_by_phase", ErrorKind::Timeout);
    let mut session = Session::new(&mut codec, 101);
    session.connect().await.unwrap();
    session.authenticate(AccessLevel::User, None).await.unwrap();

    let err = session.read(ReadOp::EnergyByPhase).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(session.state(), SessionState::Authenticated);

    // A later read is still possible at the session level
    session.read(ReadOp::Frequency).await.unwrap();
}

#[tokio::test]
async fn test_frequency_read_yields_freq_metric() {
    let mut codec = MockMercury236::ok();
    let mut session = Session::new(&mut codec, 101);
    session.connect().await.unwrap();
    session.authenticate(AccessLevel::User, None).await.unwrap();

    let metrics = session.read(ReadOp::Frequency).await.unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].0, "freq");
}

#[tokio::test]
async fn test_out_of_order_calls_are_unexpected() {
    let mut codec = MockMercury236::ok();
    let mut session = Session::new(&mut codec, 101);

    let err = session
        .read(ReadOp::EnergyTotal(ArrayNumber::SinceReset))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unexpected);

    let err = session
        .authenticate(AccessLevel::User, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unexpected);
    assert!(codec.calls.is_empty());
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let mut codec = MockMercury236::ok();
    let mut session = Session::new(&mut codec, 101);
    session.connect().await.unwrap();
    session.authenticate(AccessLevel::User, None).await.unwrap();

    session.close().await;
    session.close().await;
    assert_eq!(codec.count("close_channel"), 1);
}

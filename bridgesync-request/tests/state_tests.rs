use bridgesync_request::{Completion, FailureStep, OperationHandle, OperationState};
use pretty_assertions::assert_eq;

#[test]
fn new_handle_is_idle() {
    let handle = OperationHandle::new();
    assert_eq!(handle.state(), OperationState::NotStarted);
    assert!(!handle.is_executing());
    assert!(!handle.is_finished());
    assert!(!handle.is_cancelled());
}

#[test]
fn executing_states() {
    for state in [
        OperationState::PreparingRemote,
        OperationState::RemoteRunning,
        OperationState::Translating,
        OperationState::Importing,
    ] {
        assert!(state.is_executing(), "{state:?}");
        assert!(!state.is_finished(), "{state:?}");
    }
    let finished = OperationState::Finished(Completion::Failure(FailureStep::ImporterImport));
    assert!(finished.is_finished());
    assert!(!finished.is_executing());
}

#[test]
fn cancel_is_shared_between_clones() {
    let handle = OperationHandle::new();
    let token = handle.token();
    let clone = handle.clone();

    clone.cancel();
    assert!(handle.is_cancelled());
    assert!(token.is_cancelled());
    // Cancelling does not change the state by itself.
    assert_eq!(handle.state(), OperationState::NotStarted);
}

#[test]
fn failure_steps_display_in_snake_case() {
    assert_eq!(FailureStep::HelperPrepareRemote.to_string(), "helper_prepare_remote");
    assert_eq!(FailureStep::RemoteOperation.to_string(), "remote_operation");
    assert_eq!(FailureStep::HelperDidImport.to_string(), "helper_did_import");
}

#[test]
fn import_steps() {
    assert!(FailureStep::HelperWillImport.is_during_import());
    assert!(FailureStep::ImporterImport.is_during_import());
    assert!(FailureStep::HelperDidImport.is_during_import());
    assert!(!FailureStep::BridgeGetImporter.is_during_import());
    assert!(!FailureStep::BridgeTranslate.is_during_import());
}

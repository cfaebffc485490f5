//! Thread-local last-error channel and error-code mapping.

use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::{c_char, c_int};

use voiceprint::VoiceprintError;

use crate::types::*;

thread_local! {
    // Concurrent callers never observe each other's error text.
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::new("").unwrap());
}

/// Records the error message for the current thread.
pub(crate) fn set_last_error(msg: &str) {
    let c = CString::new(msg.replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|e| *e.borrow_mut() = c);
}

/// Pointer to the current thread's last error message. Valid until the next
/// failing call on the same thread.
pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|e| e.borrow().as_ptr())
}

/// Maps an engine error to its ABI return code.
pub(crate) fn error_code(e: &VoiceprintError) -> c_int {
    match e {
        VoiceprintError::InvalidParam(_) => VP_ERROR_INVALID_PARAM,
        VoiceprintError::NotInit => VP_ERROR_NOT_INIT,
        VoiceprintError::AlreadyInit => VP_ERROR_ALREADY_INIT,
        VoiceprintError::ModelLoad(_) => VP_ERROR_MODEL_LOAD,
        VoiceprintError::AudioTooShort { .. } => VP_ERROR_AUDIO_TOO_SHORT,
        VoiceprintError::AudioInvalid(_) => VP_ERROR_AUDIO_INVALID,
        VoiceprintError::SpeakerExists(_) => VP_ERROR_SPEAKER_EXISTS,
        VoiceprintError::SpeakerNotFound(_) => VP_ERROR_SPEAKER_NOT_FOUND,
        VoiceprintError::Db(_) => VP_ERROR_DB_ERROR,
        VoiceprintError::FileNotFound(_) => VP_ERROR_FILE_NOT_FOUND,
        VoiceprintError::BufferTooSmall => VP_ERROR_BUFFER_TOO_SMALL,
        VoiceprintError::NoMatch { .. } => VP_ERROR_NO_MATCH,
        VoiceprintError::WavFormat(_) => VP_ERROR_WAV_FORMAT,
        VoiceprintError::Inference(_) => VP_ERROR_INFERENCE,
        VoiceprintError::ModelNotAvailable(_) => VP_ERROR_MODEL_NOT_AVAILABLE,
        VoiceprintError::AnalysisFailed(_) => VP_ERROR_ANALYSIS_FAILED,
        VoiceprintError::DiarizeFailed(_) => VP_ERROR_DIARIZE_FAILED,
    }
}

/// Records the error and returns its code.
pub(crate) fn fail(e: &VoiceprintError) -> c_int {
    set_last_error(&e.to_string());
    error_code(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn last_error_roundtrip() {
        set_last_error("something broke");
        let s = unsafe { CStr::from_ptr(last_error_ptr()) };
        assert_eq!(s.to_str().unwrap(), "something broke");
    }

    #[test]
    fn interior_nul_is_sanitized() {
        set_last_error("a\0b");
        let s = unsafe { CStr::from_ptr(last_error_ptr()) };
        assert_eq!(s.to_str().unwrap(), "a b");
    }

    #[test]
    fn error_codes_are_negative_and_distinct() {
        let errors = [
            VoiceprintError::NotInit,
            VoiceprintError::AlreadyInit,
            VoiceprintError::BufferTooSmall,
            VoiceprintError::NoMatch { best_score: 0.1 },
            VoiceprintError::AudioTooShort { got: 0.1, min: 1.5 },
        ];
        let mut codes: Vec<c_int> = errors.iter().map(error_code).collect();
        assert!(codes.iter().all(|&c| c < 0));
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn threads_have_independent_errors() {
        set_last_error("main thread");
        std::thread::spawn(|| {
            set_last_error("worker thread");
            let s = unsafe { CStr::from_ptr(last_error_ptr()) };
            assert_eq!(s.to_str().unwrap(), "worker thread");
        })
        .join()
        .unwrap();
        let s = unsafe { CStr::from_ptr(last_error_ptr()) };
        assert_eq!(s.to_str().unwrap(), "main thread");
    }
}

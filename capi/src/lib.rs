//! C-compatible surface of the voiceprint engine.
//!
//! Every entry point returns an integer code (0 = VP_OK, negative on
//! failure), records a thread-local error message before returning a
//! non-OK code, and never lets a panic cross the boundary. The engine
//! lives in one process-wide context created by [`vp_init`]; init,
//! analyzer init and release are serialised by the context lock.

mod error;
mod types;

use std::ffi::CStr;
use std::os::raw::{c_char, c_float, c_int, c_uint};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use tracing::info;

use voiceprint::analyzer::emotion_name;
use voiceprint::{Diarizer, SpeakerManager, VoiceAnalyzer, VoiceprintError};
use voiceprint_audio::{resample, wav};
use voiceprint_onnx::SessionConfig;

use error::{fail, last_error_ptr, set_last_error};
pub use types::*;

struct Context {
    manager: SpeakerManager,
    analyzer: Option<VoiceAnalyzer>,
    diarizer: Option<Diarizer>,
    model_dir: PathBuf,
}

static CONTEXT: Lazy<RwLock<Option<Context>>> = Lazy::new(|| RwLock::new(None));

/// Runs an entry-point body, converting panics into VP_ERROR_UNKNOWN.
fn guard(f: impl FnOnce() -> c_int) -> c_int {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(code) => code,
        Err(_) => {
            set_last_error("internal panic");
            VP_ERROR_UNKNOWN
        }
    }
}

/// Borrows a NUL-terminated UTF-8 argument.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn str_arg<'a>(ptr: *const c_char) -> Result<&'a str, VoiceprintError> {
    if ptr.is_null() {
        return Err(VoiceprintError::InvalidParam("null string argument".into()));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| VoiceprintError::InvalidParam("argument is not valid UTF-8".into()))
}

/// Borrows a PCM buffer argument.
///
/// # Safety
/// `ptr` must be null or point to at least `n` floats.
unsafe fn pcm_arg<'a>(ptr: *const c_float, n: c_int) -> Result<&'a [f32], VoiceprintError> {
    if ptr.is_null() || n <= 0 {
        return Err(VoiceprintError::InvalidParam("null or empty pcm buffer".into()));
    }
    Ok(std::slice::from_raw_parts(ptr, n as usize))
}

/// Reads a WAV file and normalises it to 16 kHz mono f32.
fn load_pcm_from_file(path: &str) -> Result<Vec<f32>, VoiceprintError> {
    let decoded = wav::read_wav_file(path)?;
    Ok(resample::to_engine_rate(&decoded.samples, decoded.sample_rate))
}

fn with_manager<T>(
    f: impl FnOnce(&SpeakerManager) -> Result<T, VoiceprintError>,
) -> Result<T, VoiceprintError> {
    let ctx = CONTEXT.read().unwrap();
    match ctx.as_ref() {
        Some(ctx) => f(&ctx.manager),
        None => Err(VoiceprintError::NotInit),
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Initializes the engine: loads the speaker embedding network and VAD from
/// `model_dir` and opens the speaker store at `db_path`.
///
/// # Safety
/// `model_dir` and `db_path` must be null or NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn vp_init(model_dir: *const c_char, db_path: *const c_char) -> c_int {
    guard(|| {
        let mut ctx = CONTEXT.write().unwrap();
        if ctx.is_some() {
            return fail(&VoiceprintError::AlreadyInit);
        }

        let model_dir = match str_arg(model_dir) {
            Ok(s) => s,
            Err(e) => return fail(&e),
        };
        let db_path = match str_arg(db_path) {
            Ok(s) => s,
            Err(e) => return fail(&e),
        };

        info!(model_dir, db_path, "initializing voiceprint engine");
        match SpeakerManager::new(model_dir, db_path, &SessionConfig::default()) {
            Ok(manager) => {
                *ctx = Some(Context {
                    manager,
                    analyzer: None,
                    diarizer: None,
                    model_dir: PathBuf::from(model_dir),
                });
                VP_OK
            }
            Err(e) => fail(&e),
        }
    })
}

/// Releases every model session, the store and the cache. Safe to call
/// after a failed init; reinit afterwards is permitted.
#[no_mangle]
pub extern "C" fn vp_release() {
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let mut ctx = CONTEXT.write().unwrap();
        if ctx.take().is_some() {
            info!("voiceprint engine released");
        }
    }));
}

/// Loads the optional analyzer models for the requested feature flags and
/// prepares the diarizer. Requires a prior successful vp_init().
#[no_mangle]
pub extern "C" fn vp_init_analyzer(feature_flags: c_uint) -> c_int {
    guard(|| {
        let mut ctx = CONTEXT.write().unwrap();
        let ctx = match ctx.as_mut() {
            Some(ctx) => ctx,
            None => return fail(&VoiceprintError::NotInit),
        };

        let analyzer = VoiceAnalyzer::new(&ctx.model_dir, feature_flags, &SessionConfig::default());
        ctx.analyzer = Some(analyzer);
        if ctx.diarizer.is_none() {
            ctx.diarizer = Some(Diarizer::new(ctx.manager.extractor()));
        }
        VP_OK
    })
}

/// Last error message for the calling thread, NUL-terminated. Never null.
#[no_mangle]
pub extern "C" fn vp_get_last_error() -> *const c_char {
    last_error_ptr()
}

// ---------------------------------------------------------------------------
// Speaker recognition
// ---------------------------------------------------------------------------

/// Enrolls (or re-enrolls) `speaker_id` from 16 kHz mono f32 PCM.
///
/// # Safety
/// `speaker_id` must be a NUL-terminated string; `pcm_data` must point to
/// at least `sample_count` floats.
#[no_mangle]
pub unsafe extern "C" fn vp_enroll(
    speaker_id: *const c_char,
    pcm_data: *const c_float,
    sample_count: c_int,
) -> c_int {
    guard(|| {
        let result = (|| {
            let id = str_arg(speaker_id)?;
            let pcm = pcm_arg(pcm_data, sample_count)?;
            with_manager(|m| m.enroll(id, pcm))
        })();
        result.map_or_else(|e| fail(&e), |_| VP_OK)
    })
}

/// Enrolls from a WAV file (any supported format and rate).
///
/// # Safety
/// Both arguments must be NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn vp_enroll_file(
    speaker_id: *const c_char,
    wav_path: *const c_char,
) -> c_int {
    guard(|| {
        let result = (|| {
            let id = str_arg(speaker_id)?;
            let path = str_arg(wav_path)?;
            with_manager(|m| m.enroll_file(id, path))
        })();
        result.map_or_else(|e| fail(&e), |_| VP_OK)
    })
}

/// Removes an enrolled speaker.
///
/// # Safety
/// `speaker_id` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn vp_remove_speaker(speaker_id: *const c_char) -> c_int {
    guard(|| {
        let result = (|| {
            let id = str_arg(speaker_id)?;
            with_manager(|m| m.remove(id))
        })();
        result.map_or_else(|e| fail(&e), |_| VP_OK)
    })
}

/// 1:N identification. On VP_OK the best-matching id is copied into
/// `out_speaker_id`; `out_score` always receives the best score, including
/// on VP_ERROR_NO_MATCH.
///
/// # Safety
/// `pcm_data` must point to `sample_count` floats; `out_speaker_id` must
/// have room for `id_buf_size` bytes; `out_score` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn vp_identify(
    pcm_data: *const c_float,
    sample_count: c_int,
    out_speaker_id: *mut c_char,
    id_buf_size: c_int,
    out_score: *mut c_float,
) -> c_int {
    guard(|| {
        if out_speaker_id.is_null() || id_buf_size <= 0 || out_score.is_null() {
            return fail(&VoiceprintError::InvalidParam("null output argument".into()));
        }
        *out_score = 0.0;
        *out_speaker_id = 0;

        let result = (|| {
            let pcm = pcm_arg(pcm_data, sample_count)?;
            with_manager(|m| m.identify(pcm))
        })();

        match result {
            Ok((id, score)) => {
                *out_score = score;
                if id.len() >= id_buf_size as usize {
                    return fail(&VoiceprintError::BufferTooSmall);
                }
                let dst = std::slice::from_raw_parts_mut(out_speaker_id, id_buf_size as usize);
                types::copy_str(dst, &id);
                VP_OK
            }
            Err(e) => {
                if let VoiceprintError::NoMatch { best_score } = e {
                    *out_score = best_score;
                }
                fail(&e)
            }
        }
    })
}

/// 1:1 verification. VP_OK means the score was computed, not that it
/// cleared any threshold.
///
/// # Safety
/// `speaker_id` must be NUL-terminated; `pcm_data` must point to
/// `sample_count` floats; `out_score` must be valid.
#[no_mangle]
pub unsafe extern "C" fn vp_verify(
    speaker_id: *const c_char,
    pcm_data: *const c_float,
    sample_count: c_int,
    out_score: *mut c_float,
) -> c_int {
    guard(|| {
        if out_score.is_null() {
            return fail(&VoiceprintError::InvalidParam("null out_score".into()));
        }
        *out_score = 0.0;

        let result = (|| {
            let id = str_arg(speaker_id)?;
            let pcm = pcm_arg(pcm_data, sample_count)?;
            with_manager(|m| m.verify(id, pcm))
        })();

        match result {
            Ok(score) => {
                *out_score = score;
                VP_OK
            }
            Err(e) => fail(&e),
        }
    })
}

/// Sets the identification threshold; values outside [0, 1] are rejected
/// and the previous threshold stays in effect.
#[no_mangle]
pub extern "C" fn vp_set_threshold(threshold: c_float) -> c_int {
    guard(|| {
        with_manager(|m| m.set_threshold(threshold)).map_or_else(|e| fail(&e), |_| VP_OK)
    })
}

/// Number of enrolled speakers, or a negative error code.
#[no_mangle]
pub extern "C" fn vp_get_speaker_count() -> c_int {
    guard(|| {
        with_manager(|m| Ok(m.count() as c_int)).unwrap_or_else(|e| fail(&e))
    })
}

// ---------------------------------------------------------------------------
// Voice analysis
// ---------------------------------------------------------------------------

fn analyze_pcm(pcm: &[f32], feature_flags: c_uint, out: &mut VpAnalysisResult) -> c_int {
    let ctx = CONTEXT.read().unwrap();
    let ctx = match ctx.as_ref() {
        Some(ctx) => ctx,
        None => return fail(&VoiceprintError::NotInit),
    };
    let analyzer = match ctx.analyzer.as_ref() {
        Some(a) => a,
        None => {
            set_last_error("vp_init_analyzer() not called");
            return VP_ERROR_NOT_INIT;
        }
    };

    match analyzer.analyze(pcm, feature_flags) {
        Ok(result) => {
            types::fill_analysis(out, &result);
            VP_OK
        }
        Err(e) => fail(&e),
    }
}

/// Runs voice analysis for the requested features over 16 kHz mono PCM.
/// Missing optional models clear their bit in `features_computed` without
/// failing the call.
///
/// # Safety
/// `pcm_data` must point to `sample_count` floats; `out` must be valid.
#[no_mangle]
pub unsafe extern "C" fn vp_analyze(
    pcm_data: *const c_float,
    sample_count: c_int,
    feature_flags: c_uint,
    out: *mut VpAnalysisResult,
) -> c_int {
    guard(|| {
        if out.is_null() {
            return fail(&VoiceprintError::InvalidParam("null result pointer".into()));
        }
        let out = &mut *out;
        *out = VpAnalysisResult::zeroed();
        match pcm_arg(pcm_data, sample_count) {
            Ok(pcm) => analyze_pcm(pcm, feature_flags, out),
            Err(e) => fail(&e),
        }
    })
}

/// vp_analyze() over a WAV file.
///
/// # Safety
/// `wav_path` must be NUL-terminated; `out` must be valid.
#[no_mangle]
pub unsafe extern "C" fn vp_analyze_file(
    wav_path: *const c_char,
    feature_flags: c_uint,
    out: *mut VpAnalysisResult,
) -> c_int {
    guard(|| {
        if out.is_null() {
            return fail(&VoiceprintError::InvalidParam("null result pointer".into()));
        }
        let out = &mut *out;
        *out = VpAnalysisResult::zeroed();
        let pcm = match str_arg(wav_path).and_then(|p| load_pcm_from_file(p)) {
            Ok(pcm) => pcm,
            Err(e) => return fail(&e),
        };
        if pcm.is_empty() {
            return fail(&VoiceprintError::AudioInvalid("file contains no samples".into()));
        }
        analyze_pcm(&pcm, feature_flags, out)
    })
}

/// Shared body of the per-feature convenience wrappers.
///
/// # Safety
/// Caller contracts of vp_analyze() apply; `out` may be null (the result is
/// then discarded).
unsafe fn sub_analyze<T>(
    pcm_data: *const c_float,
    sample_count: c_int,
    feature_flags: c_uint,
    out: *mut T,
    pick: impl Fn(&VpAnalysisResult) -> T,
) -> c_int {
    let mut full = VpAnalysisResult::zeroed();
    let rc = vp_analyze(pcm_data, sample_count, feature_flags, &mut full);
    if rc == VP_OK && !out.is_null() {
        *out = pick(&full);
    }
    rc
}

/// # Safety
/// Same as [`sub_analyze`], for the `_file` variants.
unsafe fn sub_analyze_file<T>(
    wav_path: *const c_char,
    feature_flags: c_uint,
    out: *mut T,
    pick: impl Fn(&VpAnalysisResult) -> T,
) -> c_int {
    let mut full = VpAnalysisResult::zeroed();
    let rc = vp_analyze_file(wav_path, feature_flags, &mut full);
    if rc == VP_OK && !out.is_null() {
        *out = pick(&full);
    }
    rc
}

/// # Safety
/// See vp_analyze().
#[no_mangle]
pub unsafe extern "C" fn vp_get_gender(
    pcm_data: *const c_float,
    sample_count: c_int,
    out: *mut VpGenderResult,
) -> c_int {
    sub_analyze(pcm_data, sample_count, VP_FEATURE_GENDER, out, |r| r.gender)
}

/// # Safety
/// See vp_analyze_file().
#[no_mangle]
pub unsafe extern "C" fn vp_get_gender_file(
    wav_path: *const c_char,
    out: *mut VpGenderResult,
) -> c_int {
    sub_analyze_file(wav_path, VP_FEATURE_GENDER, out, |r| r.gender)
}

/// # Safety
/// See vp_analyze().
#[no_mangle]
pub unsafe extern "C" fn vp_get_age(
    pcm_data: *const c_float,
    sample_count: c_int,
    out: *mut VpAgeResult,
) -> c_int {
    sub_analyze(pcm_data, sample_count, VP_FEATURE_AGE, out, |r| r.age)
}

/// # Safety
/// See vp_analyze_file().
#[no_mangle]
pub unsafe extern "C" fn vp_get_age_file(wav_path: *const c_char, out: *mut VpAgeResult) -> c_int {
    sub_analyze_file(wav_path, VP_FEATURE_AGE, out, |r| r.age)
}

/// # Safety
/// See vp_analyze().
#[no_mangle]
pub unsafe extern "C" fn vp_get_emotion(
    pcm_data: *const c_float,
    sample_count: c_int,
    out: *mut VpEmotionResult,
) -> c_int {
    sub_analyze(pcm_data, sample_count, VP_FEATURE_EMOTION, out, |r| r.emotion)
}

/// # Safety
/// See vp_analyze_file().
#[no_mangle]
pub unsafe extern "C" fn vp_get_emotion_file(
    wav_path: *const c_char,
    out: *mut VpEmotionResult,
) -> c_int {
    sub_analyze_file(wav_path, VP_FEATURE_EMOTION, out, |r| r.emotion)
}

/// Static name for an emotion id ("neutral", "happy", ...; "unknown" out
/// of range).
#[no_mangle]
pub extern "C" fn vp_emotion_name(emotion_id: c_int) -> *const c_char {
    static NAMES: Lazy<Vec<std::ffi::CString>> = Lazy::new(|| {
        (0..8)
            .map(|i| std::ffi::CString::new(emotion_name(i)).unwrap())
            .collect()
    });
    static UNKNOWN: &[u8] = b"unknown\0";

    if (0..8).contains(&emotion_id) {
        NAMES[emotion_id as usize].as_ptr()
    } else {
        UNKNOWN.as_ptr() as *const c_char
    }
}

/// # Safety
/// See vp_analyze().
#[no_mangle]
pub unsafe extern "C" fn vp_anti_spoof(
    pcm_data: *const c_float,
    sample_count: c_int,
    out: *mut VpAntiSpoofResult,
) -> c_int {
    sub_analyze(pcm_data, sample_count, VP_FEATURE_ANTISPOOF, out, |r| r.antispoof)
}

/// # Safety
/// See vp_analyze_file().
#[no_mangle]
pub unsafe extern "C" fn vp_anti_spoof_file(
    wav_path: *const c_char,
    out: *mut VpAntiSpoofResult,
) -> c_int {
    sub_analyze_file(wav_path, VP_FEATURE_ANTISPOOF, out, |r| r.antispoof)
}

/// Enables or disables the anti-spoof block at runtime.
#[no_mangle]
pub extern "C" fn vp_set_antispoof_enabled(enabled: c_int) -> c_int {
    guard(|| {
        let ctx = CONTEXT.read().unwrap();
        if let Some(analyzer) = ctx.as_ref().and_then(|c| c.analyzer.as_ref()) {
            analyzer.set_antispoof_enabled(enabled != 0);
        }
        VP_OK
    })
}

/// # Safety
/// See vp_analyze().
#[no_mangle]
pub unsafe extern "C" fn vp_assess_quality(
    pcm_data: *const c_float,
    sample_count: c_int,
    out: *mut VpQualityResult,
) -> c_int {
    sub_analyze(
        pcm_data,
        sample_count,
        VP_FEATURE_QUALITY | VP_FEATURE_VOICE_FEATS,
        out,
        |r| r.quality,
    )
}

/// # Safety
/// See vp_analyze_file().
#[no_mangle]
pub unsafe extern "C" fn vp_assess_quality_file(
    wav_path: *const c_char,
    out: *mut VpQualityResult,
) -> c_int {
    sub_analyze_file(
        wav_path,
        VP_FEATURE_QUALITY | VP_FEATURE_VOICE_FEATS,
        out,
        |r| r.quality,
    )
}

/// # Safety
/// See vp_analyze().
#[no_mangle]
pub unsafe extern "C" fn vp_analyze_voice(
    pcm_data: *const c_float,
    sample_count: c_int,
    out: *mut VpVoiceFeatures,
) -> c_int {
    sub_analyze(pcm_data, sample_count, VP_FEATURE_VOICE_FEATS, out, |r| {
        r.voice_features
    })
}

/// # Safety
/// See vp_analyze_file().
#[no_mangle]
pub unsafe extern "C" fn vp_analyze_voice_file(
    wav_path: *const c_char,
    out: *mut VpVoiceFeatures,
) -> c_int {
    sub_analyze_file(wav_path, VP_FEATURE_VOICE_FEATS, out, |r| r.voice_features)
}

/// # Safety
/// See vp_analyze().
#[no_mangle]
pub unsafe extern "C" fn vp_get_pleasantness(
    pcm_data: *const c_float,
    sample_count: c_int,
    out: *mut VpPleasantnessResult,
) -> c_int {
    sub_analyze(
        pcm_data,
        sample_count,
        VP_FEATURE_QUALITY | VP_FEATURE_VOICE_FEATS | VP_FEATURE_EMOTION | VP_FEATURE_PLEASANTNESS,
        out,
        |r| r.pleasantness,
    )
}

/// # Safety
/// See vp_analyze_file().
#[no_mangle]
pub unsafe extern "C" fn vp_get_pleasantness_file(
    wav_path: *const c_char,
    out: *mut VpPleasantnessResult,
) -> c_int {
    sub_analyze_file(
        wav_path,
        VP_FEATURE_QUALITY | VP_FEATURE_VOICE_FEATS | VP_FEATURE_EMOTION | VP_FEATURE_PLEASANTNESS,
        out,
        |r| r.pleasantness,
    )
}

/// # Safety
/// See vp_analyze().
#[no_mangle]
pub unsafe extern "C" fn vp_get_voice_state(
    pcm_data: *const c_float,
    sample_count: c_int,
    out: *mut VpVoiceState,
) -> c_int {
    sub_analyze(
        pcm_data,
        sample_count,
        VP_FEATURE_QUALITY | VP_FEATURE_VOICE_FEATS | VP_FEATURE_EMOTION | VP_FEATURE_VOICE_STATE,
        out,
        |r| r.voice_state,
    )
}

/// # Safety
/// See vp_analyze_file().
#[no_mangle]
pub unsafe extern "C" fn vp_get_voice_state_file(
    wav_path: *const c_char,
    out: *mut VpVoiceState,
) -> c_int {
    sub_analyze_file(
        wav_path,
        VP_FEATURE_QUALITY | VP_FEATURE_VOICE_FEATS | VP_FEATURE_EMOTION | VP_FEATURE_VOICE_STATE,
        out,
        |r| r.voice_state,
    )
}

/// # Safety
/// See vp_analyze().
#[no_mangle]
pub unsafe extern "C" fn vp_detect_language(
    pcm_data: *const c_float,
    sample_count: c_int,
    out: *mut VpLanguageResult,
) -> c_int {
    sub_analyze(pcm_data, sample_count, VP_FEATURE_LANGUAGE, out, |r| r.language)
}

/// # Safety
/// See vp_analyze_file().
#[no_mangle]
pub unsafe extern "C" fn vp_detect_language_file(
    wav_path: *const c_char,
    out: *mut VpLanguageResult,
) -> c_int {
    sub_analyze_file(wav_path, VP_FEATURE_LANGUAGE, out, |r| r.language)
}

/// English name for an ISO 639-1 code. Unknown codes echo the input
/// pointer back.
///
/// # Safety
/// `lang_code` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn vp_language_name(lang_code: *const c_char) -> *const c_char {
    static NAMES: Lazy<std::collections::HashMap<&'static str, std::ffi::CString>> =
        Lazy::new(|| {
            voiceprint::analyzer::language_table()
                .iter()
                .map(|&(code, name)| (code, std::ffi::CString::new(name).unwrap()))
                .collect()
        });
    static EMPTY: &[u8] = b"\0";

    if lang_code.is_null() {
        return EMPTY.as_ptr() as *const c_char;
    }
    let code = match CStr::from_ptr(lang_code).to_str() {
        Ok(s) => s,
        Err(_) => return lang_code,
    };
    match NAMES.get(code) {
        Some(name) => name.as_ptr(),
        None => lang_code,
    }
}

// ---------------------------------------------------------------------------
// Diarization
// ---------------------------------------------------------------------------

fn diarize_pcm(pcm: &[f32], out_segments: &mut [VpDiarizeSegment]) -> Result<c_int, VoiceprintError> {
    let ctx = CONTEXT.read().unwrap();
    let ctx = ctx.as_ref().ok_or(VoiceprintError::NotInit)?;
    let diarizer = ctx.diarizer.as_ref().ok_or(VoiceprintError::NotInit)?;

    let segments = diarizer.diarize_with_manager(pcm, out_segments.len(), &ctx.manager)?;
    for (dst, seg) in out_segments.iter_mut().zip(segments.iter()) {
        types::fill_segment(dst, seg);
    }
    Ok(segments.len() as c_int)
}

/// Diarizes 16 kHz mono PCM into per-speaker segments. Writes at most
/// `max_segments` entries and reports the actual count.
///
/// # Safety
/// `pcm_data` must point to `sample_count` floats; `out_segments` must have
/// room for `max_segments` entries; `out_count` must be valid.
#[no_mangle]
pub unsafe extern "C" fn vp_diarize(
    pcm_data: *const c_float,
    sample_count: c_int,
    out_segments: *mut VpDiarizeSegment,
    max_segments: c_int,
    out_count: *mut c_int,
) -> c_int {
    guard(|| {
        if out_segments.is_null() || max_segments <= 0 || out_count.is_null() {
            return fail(&VoiceprintError::InvalidParam("null output argument".into()));
        }
        *out_count = 0;
        let out = std::slice::from_raw_parts_mut(out_segments, max_segments as usize);

        let result = (|| {
            let pcm = pcm_arg(pcm_data, sample_count)?;
            diarize_pcm(pcm, out)
        })();
        match result {
            Ok(count) => {
                *out_count = count;
                VP_OK
            }
            Err(e) => fail(&e),
        }
    })
}

/// vp_diarize() over a WAV file.
///
/// # Safety
/// `wav_path` must be NUL-terminated; output contracts of vp_diarize()
/// apply.
#[no_mangle]
pub unsafe extern "C" fn vp_diarize_file(
    wav_path: *const c_char,
    out_segments: *mut VpDiarizeSegment,
    max_segments: c_int,
    out_count: *mut c_int,
) -> c_int {
    guard(|| {
        if out_segments.is_null() || max_segments <= 0 || out_count.is_null() {
            return fail(&VoiceprintError::InvalidParam("null output argument".into()));
        }
        *out_count = 0;
        let out = std::slice::from_raw_parts_mut(out_segments, max_segments as usize);

        let result = str_arg(wav_path)
            .and_then(|p| load_pcm_from_file(p))
            .and_then(|pcm| {
                if pcm.is_empty() {
                    return Err(VoiceprintError::AudioInvalid("file contains no samples".into()));
                }
                diarize_pcm(&pcm, out)
            });
        match result {
            Ok(count) => {
                *out_count = count;
                VP_OK
            }
            Err(e) => fail(&e),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    // The context is process-global, so these tests only exercise the
    // pre-init failure paths and the static lookups; model-backed flows
    // live in the integration suite.

    #[test]
    fn calls_before_init_report_not_init() {
        let pcm = [0.0f32; 1600];
        let mut score = 0.0f32;
        let mut id_buf = [0 as c_char; 64];
        let rc = unsafe {
            vp_identify(pcm.as_ptr(), pcm.len() as c_int, id_buf.as_mut_ptr(), 64, &mut score)
        };
        assert_eq!(rc, VP_ERROR_NOT_INIT);

        let id = CString::new("alice").unwrap();
        let rc = unsafe { vp_enroll(id.as_ptr(), pcm.as_ptr(), pcm.len() as c_int) };
        assert_eq!(rc, VP_ERROR_NOT_INIT);

        assert_eq!(vp_get_speaker_count(), VP_ERROR_NOT_INIT);
        assert_eq!(vp_set_threshold(0.5), VP_ERROR_NOT_INIT);
        assert_eq!(vp_init_analyzer(VP_FEATURE_ALL), VP_ERROR_NOT_INIT);
    }

    #[test]
    fn release_without_init_is_safe() {
        vp_release();
        vp_release();
    }

    #[test]
    fn null_arguments_are_invalid() {
        let mut score = 0.0f32;
        let rc = unsafe { vp_verify(std::ptr::null(), std::ptr::null(), 0, &mut score) };
        assert_eq!(rc, VP_ERROR_INVALID_PARAM);

        let rc = unsafe { vp_analyze(std::ptr::null(), 0, VP_FEATURE_ALL, std::ptr::null_mut()) };
        assert_eq!(rc, VP_ERROR_INVALID_PARAM);
    }

    #[test]
    fn emotion_name_lookup() {
        let neutral = unsafe { CStr::from_ptr(vp_emotion_name(0)) };
        assert_eq!(neutral.to_str().unwrap(), "neutral");
        let unknown = unsafe { CStr::from_ptr(vp_emotion_name(99)) };
        assert_eq!(unknown.to_str().unwrap(), "unknown");
    }

    #[test]
    fn language_name_lookup() {
        let zh = CString::new("zh").unwrap();
        let name = unsafe { CStr::from_ptr(vp_language_name(zh.as_ptr())) };
        assert_eq!(name.to_str().unwrap(), "Chinese");

        // Unknown codes echo the input pointer.
        let xx = CString::new("xx").unwrap();
        let echoed = unsafe { vp_language_name(xx.as_ptr()) };
        assert_eq!(echoed, xx.as_ptr() as *const c_char);
    }

    #[test]
    fn last_error_is_populated_on_failure() {
        vp_release();
        assert_eq!(vp_get_speaker_count(), VP_ERROR_NOT_INIT);
        let msg = unsafe { CStr::from_ptr(vp_get_last_error()) };
        assert!(!msg.to_bytes().is_empty());
    }
}

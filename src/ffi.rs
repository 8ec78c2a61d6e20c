//! C Foreign Function Interface (FFI) for Drape.
//!
//! A C-compatible surface over [`Engine`] for hosts that embed the map
//! view from another runtime. Every function is `extern "C"` with a
//! stable ABI; fallible calls return a [`DrapeResult`].
//!
//! # Safety
//!
//! Functions that accept pointers check them for null and report
//! [`DrapeResult::NullPointer`]. Non-null pointers must be valid and, for
//! handles, come from [`drape_engine_new`] or [`drape_engine_new_with_config`].
//!
//! # Example (C)
//!
//! ```c
//! #include "drape.h"
//!
//! int main() {
//!     DrapeEngineHandle* engine = drape_engine_new(1080, 1920);
//!     if (!engine) return 1;
//!
//!     drape_engine_scale(engine, 2.0, 540.0, 960.0, true);
//!
//!     double x, y;
//!     bool known;
//!     drape_engine_get_my_position(engine, &x, &y, &known);
//!
//!     drape_engine_destroy(engine);
//!     return 0;
//! }
//! ```

// FFI modules intentionally use unsafe and no_mangle
#![allow(unsafe_code)]
#![allow(unsafe_op_in_unsafe_fn)]
#![allow(clippy::missing_safety_doc)]
#![allow(clippy::not_unsafe_ptr_arg_deref)]

use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;
use std::slice;
use std::sync::Arc;

use crate::engine::{DrapeId, Engine, EngineConfig, EngineParams};
use crate::error::EngineError;
use crate::geometry::PointD;
use crate::message::{RouteSegment, SelectedObject, TouchEvent, TouchKind};
use crate::place_page::{BookmarkRef, MapObject, MapObjectType, PlacePageInfo};
use crate::settings::MemorySettings;

// =============================================================================
// Opaque Handle Types
// =============================================================================

/// Opaque handle to a Drape engine.
pub struct DrapeEngineHandle(Engine);

// =============================================================================
// Result and Error Codes
// =============================================================================

/// Result codes for FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrapeResult {
    /// Operation succeeded.
    Ok = 0,
    /// Null pointer passed.
    NullPointer = 1,
    /// Invalid UTF-8 string.
    InvalidUtf8 = 2,
    /// Zero viewport dimension.
    InvalidViewport = 3,
    /// Worker queue already closed.
    ThreadClosed = 4,
    /// Blocking call timed out.
    Timeout = 5,
    /// Worker dropped the request.
    WorkerGone = 6,
    /// Bad configuration document.
    InvalidConfig = 7,
    /// Thread or graphics context could not be created.
    SystemError = 8,
}

impl From<&EngineError> for DrapeResult {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::ThreadClosed(_) => Self::ThreadClosed,
            EngineError::InvalidViewport { .. } => Self::InvalidViewport,
            EngineError::BlockingCallTimedOut { .. } => Self::Timeout,
            EngineError::WorkerGone { .. } => Self::WorkerGone,
            EngineError::Config(_) => Self::InvalidConfig,
            EngineError::Spawn(_) | EngineError::Context(_) => Self::SystemError,
        }
    }
}

fn to_result<T>(result: crate::error::Result<T>) -> DrapeResult {
    match result {
        Ok(_) => DrapeResult::Ok,
        Err(err) => DrapeResult::from(&err),
    }
}

/// Touch phase.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrapeTouchKind {
    /// Finger down.
    Down = 0,
    /// Finger moved.
    Move = 1,
    /// Finger up.
    Up = 2,
    /// Gesture cancelled.
    Cancel = 3,
}

impl From<DrapeTouchKind> for TouchKind {
    fn from(kind: DrapeTouchKind) -> Self {
        match kind {
            DrapeTouchKind::Down => Self::Down,
            DrapeTouchKind::Move => Self::Move,
            DrapeTouchKind::Up => Self::Up,
            DrapeTouchKind::Cancel => Self::Cancel,
        }
    }
}

/// Selected object kind.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrapeSelectedObject {
    /// Nothing selected.
    Empty = 0,
    /// Point of interest.
    Poi = 1,
    /// User mark.
    UserMark = 2,
    /// Position marker.
    MyPosition = 3,
}

impl From<SelectedObject> for DrapeSelectedObject {
    fn from(object: SelectedObject) -> Self {
        match object {
            SelectedObject::Empty => Self::Empty,
            SelectedObject::Poi => Self::Poi,
            SelectedObject::UserMark => Self::UserMark,
            SelectedObject::MyPosition => Self::MyPosition,
        }
    }
}

// =============================================================================
// Engine Functions
// =============================================================================

fn create(width: u32, height: u32, config: EngineConfig) -> *mut DrapeEngineHandle {
    let mut params = EngineParams::new(width, height, Arc::new(MemorySettings::new()));
    params.config = config;
    match Engine::new(params) {
        Ok(engine) => Box::into_raw(Box::new(DrapeEngineHandle(engine))),
        Err(err) => {
            tracing::error!(%err, "engine creation failed");
            ptr::null_mut()
        }
    }
}

/// Create an engine with default configuration and in-memory settings.
///
/// Returns NULL on failure.
#[unsafe(no_mangle)]
pub extern "C" fn drape_engine_new(width: u32, height: u32) -> *mut DrapeEngineHandle {
    create(width, height, EngineConfig::default())
}

/// Create an engine configured by a TOML document.
///
/// Returns NULL if the document is not valid UTF-8 or not a valid
/// configuration, or if the engine fails to start.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drape_engine_new_with_config(
    width: u32,
    height: u32,
    config_toml: *const c_char,
) -> *mut DrapeEngineHandle {
    if config_toml.is_null() {
        return ptr::null_mut();
    }
    let Ok(document) = CStr::from_ptr(config_toml).to_str() else {
        return ptr::null_mut();
    };
    match EngineConfig::from_toml_str(document) {
        Ok(config) => create(width, height, config),
        Err(err) => {
            tracing::warn!(%err, "rejected engine configuration");
            ptr::null_mut()
        }
    }
}

/// Stop the workers and free the engine.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drape_engine_destroy(engine: *mut DrapeEngineHandle) {
    if !engine.is_null() {
        let handle = Box::from_raw(engine);
        handle.0.shutdown();
    }
}

/// Resize the drawing surface.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drape_engine_resize(engine: *mut DrapeEngineHandle, width: u32, height: u32) -> DrapeResult {
    if engine.is_null() {
        return DrapeResult::NullPointer;
    }
    to_result((*engine).0.resize(width, height))
}

/// Feed a single-finger touch sample.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drape_engine_touch(
    engine: *const DrapeEngineHandle,
    kind: DrapeTouchKind,
    pointer_id: i64,
    x: f64,
    y: f64,
) -> DrapeResult {
    if engine.is_null() {
        return DrapeResult::NullPointer;
    }
    let event = TouchEvent::single(kind.into(), pointer_id, PointD::new(x, y));
    (*engine).0.add_touch_event(event);
    DrapeResult::Ok
}

/// Scale around a pixel point.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drape_engine_scale(
    engine: *const DrapeEngineHandle,
    factor: f64,
    x: f64,
    y: f64,
    animate: bool,
) -> DrapeResult {
    if engine.is_null() {
        return DrapeResult::NullPointer;
    }
    (*engine).0.scale(factor, PointD::new(x, y), animate);
    DrapeResult::Ok
}

/// Center the view on a mercator point. A negative zoom keeps the scale.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drape_engine_set_center(
    engine: *const DrapeEngineHandle,
    x: f64,
    y: f64,
    zoom: i32,
    animate: bool,
) -> DrapeResult {
    if engine.is_null() {
        return DrapeResult::NullPointer;
    }
    let zoom = u8::try_from(zoom).ok();
    (*engine).0.set_model_view_center(PointD::new(x, y), zoom, animate);
    DrapeResult::Ok
}

/// Add a route segment from `point_count` interleaved x/y pairs.
///
/// The new segment id is written to `id_out`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drape_engine_add_route_segment(
    engine: *const DrapeEngineHandle,
    coords: *const f64,
    point_count: usize,
    color: *const c_char,
    id_out: *mut u64,
) -> DrapeResult {
    if engine.is_null() || color.is_null() || id_out.is_null() || (coords.is_null() && point_count > 0) {
        return DrapeResult::NullPointer;
    }
    let Ok(color) = CStr::from_ptr(color).to_str() else {
        return DrapeResult::InvalidUtf8;
    };
    let polyline = if point_count == 0 {
        Vec::new()
    } else {
        slice::from_raw_parts(coords, point_count * 2)
            .chunks_exact(2)
            .map(|pair| PointD::new(pair[0], pair[1]))
            .collect()
    };
    let segment = RouteSegment {
        polyline,
        color: color.to_string(),
        is_transit: false,
    };
    *id_out = (*engine).0.add_route_segment(segment).get();
    DrapeResult::Ok
}

/// Remove a route segment.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drape_engine_remove_route_segment(
    engine: *const DrapeEngineHandle,
    id: u64,
    deactivate_following: bool,
) -> DrapeResult {
    if engine.is_null() {
        return DrapeResult::NullPointer;
    }
    (*engine).0.remove_route_segment(DrapeId::from_raw(id), deactivate_following);
    DrapeResult::Ok
}

/// Query the position marker. Blocks until the render thread answers.
///
/// `known_out` is false while no fix has arrived.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drape_engine_get_my_position(
    engine: *const DrapeEngineHandle,
    x_out: *mut f64,
    y_out: *mut f64,
    known_out: *mut bool,
) -> DrapeResult {
    if engine.is_null() || x_out.is_null() || y_out.is_null() || known_out.is_null() {
        return DrapeResult::NullPointer;
    }
    match (*engine).0.get_my_position() {
        Ok(position) => {
            let point = position.unwrap_or(PointD::ZERO);
            *x_out = point.x;
            *y_out = point.y;
            *known_out = position.is_some();
            DrapeResult::Ok
        }
        Err(err) => DrapeResult::from(&err),
    }
}

/// Query the selected object kind. Blocks until the render thread answers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drape_engine_get_selected_object(
    engine: *const DrapeEngineHandle,
    object_out: *mut DrapeSelectedObject,
) -> DrapeResult {
    if engine.is_null() || object_out.is_null() {
        return DrapeResult::NullPointer;
    }
    match (*engine).0.get_selected_object() {
        Ok(object) => {
            *object_out = object.into();
            DrapeResult::Ok
        }
        Err(err) => DrapeResult::from(&err),
    }
}

/// Enter or leave choose-position mode, keeping the current center.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drape_engine_enable_choose_position_mode(
    engine: *mut DrapeEngineHandle,
    enable: bool,
) -> DrapeResult {
    if engine.is_null() {
        return DrapeResult::NullPointer;
    }
    (*engine).0.enable_choose_position_mode(enable, Vec::new(), None);
    DrapeResult::Ok
}

/// Whether choose-position mode is active. False for a null handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drape_engine_is_choose_position_mode(engine: *const DrapeEngineHandle) -> bool {
    if engine.is_null() {
        return false;
    }
    (*engine).0.is_choose_position_mode()
}

/// Turn kinetic scrolling on or off.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drape_engine_set_kinetic_scroll_enabled(
    engine: *mut DrapeEngineHandle,
    enabled: bool,
) -> DrapeResult {
    if engine.is_null() {
        return DrapeResult::NullPointer;
    }
    (*engine).0.set_kinetic_scroll_enabled(enabled);
    DrapeResult::Ok
}

/// Whether kinetic scrolling is on. False for a null handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drape_engine_is_kinetic_scroll_enabled(engine: *const DrapeEngineHandle) -> bool {
    if engine.is_null() {
        return false;
    }
    (*engine).0.is_kinetic_scroll_enabled()
}

// =============================================================================
// Place Page Functions
// =============================================================================

/// Classify a place the way the host place page shows it.
///
/// `api_url` may be NULL.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drape_map_object_type(
    is_bookmark: bool,
    is_my_position: bool,
    api_url: *const c_char,
) -> MapObjectType {
    let api_url = if api_url.is_null() {
        None
    } else {
        Some(CStr::from_ptr(api_url).to_string_lossy().into_owned())
    };
    let info = PlacePageInfo {
        bookmark: is_bookmark.then(|| BookmarkRef {
            category: 0,
            bookmark: 0,
            name: String::new(),
        }),
        is_my_position,
        api_url,
        ..PlacePageInfo::default()
    };
    MapObject::from_info(&info).kind()
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Get the library version.
#[unsafe(no_mangle)]
pub extern "C" fn drape_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr().cast()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drape_version() {
        unsafe {
            let version = drape_version();
            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(version_str, env!("CARGO_PKG_VERSION"));
        }
    }

    #[test]
    fn test_null_handles() {
        unsafe {
            assert_eq!(drape_engine_resize(ptr::null_mut(), 10, 10), DrapeResult::NullPointer);
            assert_eq!(
                drape_engine_touch(ptr::null(), DrapeTouchKind::Down, 0, 1.0, 1.0),
                DrapeResult::NullPointer
            );
            assert_eq!(
                drape_engine_remove_route_segment(ptr::null(), 1, false),
                DrapeResult::NullPointer
            );
            assert!(!drape_engine_is_kinetic_scroll_enabled(ptr::null()));
            assert!(drape_engine_new_with_config(10, 10, ptr::null()).is_null());
            drape_engine_destroy(ptr::null_mut());
        }
    }

    #[test]
    fn test_map_object_type() {
        let url = c"ge0://abc";
        unsafe {
            assert_eq!(drape_map_object_type(false, false, ptr::null()), MapObjectType::Poi);
            assert_eq!(drape_map_object_type(false, false, url.as_ptr()), MapObjectType::ApiPoint);
            assert_eq!(drape_map_object_type(false, true, url.as_ptr()), MapObjectType::MyPosition);
            assert_eq!(drape_map_object_type(true, true, url.as_ptr()), MapObjectType::Bookmark);
        }
    }

    #[test]
    fn test_engine_round_trip() {
        unsafe {
            let engine = drape_engine_new(800, 600);
            assert!(!engine.is_null());

            assert_eq!(drape_engine_resize(engine, 0, 600), DrapeResult::InvalidViewport);
            assert_eq!(drape_engine_resize(engine, 1024, 768), DrapeResult::Ok);

            let coords = [0.0, 0.0, 1.0, 1.0];
            let mut id = 0_u64;
            let result =
                drape_engine_add_route_segment(engine, coords.as_ptr(), 2, c"red".as_ptr(), &mut id);
            assert_eq!(result, DrapeResult::Ok);
            assert!(id > 0);
            assert_eq!(drape_engine_remove_route_segment(engine, id, false), DrapeResult::Ok);

            let (mut x, mut y, mut known) = (1.0, 1.0, true);
            assert_eq!(drape_engine_get_my_position(engine, &mut x, &mut y, &mut known), DrapeResult::Ok);
            assert!(!known);

            let mut selected = DrapeSelectedObject::Poi;
            assert_eq!(drape_engine_get_selected_object(engine, &mut selected), DrapeResult::Ok);
            assert_eq!(selected, DrapeSelectedObject::Empty);

            assert!(drape_engine_is_kinetic_scroll_enabled(engine));
            assert_eq!(drape_engine_enable_choose_position_mode(engine, true), DrapeResult::Ok);
            assert!(drape_engine_is_choose_position_mode(engine));
            assert_eq!(drape_engine_set_kinetic_scroll_enabled(engine, false), DrapeResult::Ok);
            assert_eq!(drape_engine_enable_choose_position_mode(engine, false), DrapeResult::Ok);
            assert!(!drape_engine_is_choose_position_mode(engine));
            assert!(!drape_engine_is_kinetic_scroll_enabled(engine));

            drape_engine_destroy(engine);
        }
    }

    #[test]
    fn test_bad_config_document() {
        unsafe {
            let engine = drape_engine_new_with_config(10, 10, c"frame_interval_ms = \"fast\"".as_ptr());
            assert!(engine.is_null());
        }
    }
}

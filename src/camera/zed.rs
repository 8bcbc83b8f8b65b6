//! ZED SDK sessions through the SDK's C API (`libsl_zed_c`).
//!
//! The C API addresses cameras by an integer slot; this backend always uses
//! slot 0, so one process drives one camera. Struct layouts and enum values
//! track the 4.x C API.

use anyhow::{anyhow, Result};
use std::ffi::CString;
use std::os::raw::c_int;

use super::{
    CameraInformation, DepthMode, InitParameters, InputSource, ReplayPosition, Resolution,
    StreamingCodec, StreamingParameters, Unit, View,
};
use crate::error::ErrorCode;
use crate::frame::{Frame, Timestamp, BYTES_PER_PIXEL};

const CAMERA_ID: i32 = 0;

#[allow(non_camel_case_types, non_snake_case, dead_code)]
mod ffi {
    use std::os::raw::{c_char, c_float, c_int, c_uchar, c_uint, c_ulonglong, c_ushort, c_void};

    pub const SL_INPUT_TYPE_USB: c_int = 0;
    pub const SL_INPUT_TYPE_SVO: c_int = 1;
    pub const SL_FLIP_MODE_AUTO: c_int = 2;
    pub const SL_COORDINATE_SYSTEM_IMAGE: c_int = 0;
    pub const SL_REFERENCE_FRAME_CAMERA: c_int = 1;
    pub const SL_MEM_CPU: c_int = 0;
    pub const SL_MAT_TYPE_U8_C4: c_int = 7;

    #[repr(C)]
    pub struct SL_InitParameters {
        pub input_type: c_int,
        pub resolution: c_int,
        pub camera_fps: c_int,
        pub camera_device_id: c_int,
        pub camera_image_flip: c_int,
        pub camera_disable_self_calib: bool,
        pub enable_right_side_measure: bool,
        pub svo_real_time_mode: bool,
        pub depth_mode: c_int,
        pub depth_stabilization: c_int,
        pub depth_minimum_distance: c_float,
        pub depth_maximum_distance: c_float,
        pub coordinate_unit: c_int,
        pub coordinate_system: c_int,
        pub sdk_gpu_id: c_int,
        pub sdk_verbose: c_int,
        pub sensors_required: bool,
        pub enable_image_enhancement: bool,
        pub open_timeout_sec: c_float,
        pub async_grab_camera_recovery: bool,
        pub grab_compute_capping_fps: c_float,
        pub enable_image_validity_check: bool,
    }

    #[repr(C)]
    pub struct SL_RuntimeParameters {
        pub reference_frame: c_int,
        pub enable_depth: bool,
        pub enable_fill_mode: bool,
        pub confidence_threshold: c_int,
        pub texture_confidence_threshold: c_int,
        pub remove_saturated_areas: bool,
    }

    extern "C" {
        pub fn sl_create_camera(camera_id: c_int) -> bool;
        pub fn sl_open_camera(
            camera_id: c_int,
            init_parameters: *mut SL_InitParameters,
            serial_number: c_uint,
            path_svo: *const c_char,
            ip: *const c_char,
            stream_port: c_int,
            output_file: *const c_char,
            opt_settings_path: *const c_char,
            opencv_calib_path: *const c_char,
        ) -> c_int;
        pub fn sl_close_camera(camera_id: c_int);
        pub fn sl_grab(camera_id: c_int, runtime: *mut SL_RuntimeParameters) -> c_int;
        pub fn sl_enable_streaming(
            camera_id: c_int,
            codec: c_int,
            bitrate: c_uint,
            port: c_ushort,
            gop_size: c_int,
            adaptative_bitrate: c_int,
            chunk_size: c_int,
            target_framerate: c_int,
        ) -> c_int;
        pub fn sl_disable_streaming(camera_id: c_int);
        pub fn sl_get_width(camera_id: c_int) -> c_int;
        pub fn sl_get_height(camera_id: c_int) -> c_int;
        pub fn sl_get_camera_fps(camera_id: c_int) -> c_float;
        pub fn sl_get_svo_number_of_frames(camera_id: c_int) -> c_int;
        pub fn sl_get_svo_position(camera_id: c_int) -> c_int;
        pub fn sl_get_image_timestamp(camera_id: c_int) -> c_ulonglong;
        pub fn sl_retrieve_image(
            camera_id: c_int,
            image_ptr: *mut c_void,
            view: c_int,
            mem: c_int,
            width: c_int,
            height: c_int,
            cuda_stream: *mut c_void,
        ) -> c_int;
        pub fn sl_mat_create_new(width: c_int, height: c_int, mat_type: c_int, mem: c_int)
            -> *mut c_void;
        pub fn sl_mat_get_ptr(ptr: *mut c_void, mem: c_int) -> *mut c_uchar;
        pub fn sl_mat_get_step_bytes(ptr: *mut c_void, mem: c_int) -> c_int;
        pub fn sl_mat_free(ptr: *mut c_void, mem: c_int);
    }
}

fn resolution_raw(resolution: Resolution) -> i32 {
    match resolution {
        Resolution::Hd2k => 2,
        Resolution::Hd1080 => 3,
        Resolution::Hd1200 => 4,
        Resolution::Hd720 => 6,
        Resolution::Svga => 7,
        Resolution::Vga => 8,
        Resolution::Auto => 9,
    }
}

fn depth_mode_raw(mode: DepthMode) -> i32 {
    match mode {
        DepthMode::None => 0,
        DepthMode::Performance => 1,
        DepthMode::Quality => 2,
        DepthMode::Ultra => 3,
        DepthMode::Neural => 4,
    }
}

fn unit_raw(unit: Unit) -> i32 {
    match unit {
        Unit::Millimeter => 0,
        Unit::Centimeter => 1,
        Unit::Meter => 2,
        Unit::Inch => 3,
        Unit::Foot => 4,
    }
}

fn view_raw(view: View) -> i32 {
    match view {
        View::Left => 0,
        View::Right => 1,
        View::LeftUnrectified => 4,
        View::RightUnrectified => 5,
    }
}

fn codec_raw(codec: StreamingCodec) -> i32 {
    match codec {
        StreamingCodec::H264 => 0,
        StreamingCodec::H265 => 1,
    }
}

/// CPU-side `U8_C4` image owned by the SDK.
struct SdkMat {
    ptr: *mut std::ffi::c_void,
    width: u32,
    height: u32,
}

impl SdkMat {
    fn new(width: u32, height: u32) -> Result<Self, ErrorCode> {
        // SAFETY: plain allocation call; a null return is handled below.
        let ptr = unsafe {
            ffi::sl_mat_create_new(
                width as i32,
                height as i32,
                ffi::SL_MAT_TYPE_U8_C4,
                ffi::SL_MEM_CPU,
            )
        };
        if ptr.is_null() {
            return Err(ErrorCode::Failure);
        }
        Ok(Self { ptr, width, height })
    }
}

impl Drop for SdkMat {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from sl_mat_create_new and is freed once.
        unsafe { ffi::sl_mat_free(self.ptr, ffi::SL_MEM_CPU) }
    }
}

/// An `InputSource` converted to what `sl_open_camera` takes.
struct SdkInput {
    input_type: c_int,
    device_id: c_int,
    svo_path: Option<CString>,
}

impl SdkInput {
    fn from_source(input: &InputSource) -> Result<Self> {
        match input {
            InputSource::Device(index) => Ok(Self {
                input_type: ffi::SL_INPUT_TYPE_USB,
                device_id: *index as c_int,
                svo_path: None,
            }),
            InputSource::Recording(path) => {
                let utf8 = path
                    .to_str()
                    .ok_or_else(|| anyhow!("SVO path is not valid UTF-8: {}", path.display()))?;
                let svo_path = CString::new(utf8)
                    .map_err(|_| anyhow!("SVO path contains a NUL byte: {}", path.display()))?;
                Ok(Self {
                    input_type: ffi::SL_INPUT_TYPE_SVO,
                    device_id: 0,
                    svo_path: Some(svo_path),
                })
            }
            InputSource::Synthetic(url) => Err(anyhow!("{} is not a ZED SDK input", url)),
        }
    }
}

pub(super) struct ZedCamera {
    info: CameraInformation,
    recording: bool,
    runtime: ffi::SL_RuntimeParameters,
    mat: Option<SdkMat>,
}

impl ZedCamera {
    pub(super) fn open(params: &InitParameters) -> Result<Self> {
        let SdkInput {
            input_type,
            device_id,
            svo_path,
        } = SdkInput::from_source(&params.input)?;

        // No early return may follow slot creation without closing it.
        // SAFETY: creating slot 0 has no preconditions.
        if !unsafe { ffi::sl_create_camera(CAMERA_ID) } {
            return Err(anyhow!("failed to create ZED camera slot {}", CAMERA_ID));
        }

        let mut init = ffi::SL_InitParameters {
            input_type,
            resolution: resolution_raw(params.resolution),
            camera_fps: 0,
            camera_device_id: device_id,
            camera_image_flip: ffi::SL_FLIP_MODE_AUTO,
            camera_disable_self_calib: false,
            enable_right_side_measure: false,
            svo_real_time_mode: false,
            depth_mode: depth_mode_raw(params.depth_mode),
            depth_stabilization: 1,
            depth_minimum_distance: -1.0,
            depth_maximum_distance: 40.0,
            coordinate_unit: unit_raw(params.coordinate_units),
            coordinate_system: ffi::SL_COORDINATE_SYSTEM_IMAGE,
            sdk_gpu_id: -1,
            sdk_verbose: i32::from(params.sdk_verbose),
            sensors_required: false,
            enable_image_enhancement: true,
            open_timeout_sec: 5.0,
            async_grab_camera_recovery: false,
            grab_compute_capping_fps: 0.0,
            enable_image_validity_check: false,
        };
        let empty = CString::default();
        let svo_ptr = svo_path.as_ref().map_or(empty.as_ptr(), |path| path.as_ptr());

        // SAFETY: every pointer outlives the call; strings are NUL-terminated.
        let status = unsafe {
            ffi::sl_open_camera(
                CAMERA_ID,
                &mut init,
                0,
                svo_ptr,
                empty.as_ptr(),
                0,
                empty.as_ptr(),
                empty.as_ptr(),
                empty.as_ptr(),
            )
        };
        if let Err(code) = ErrorCode::from_raw(status) {
            // SAFETY: closing a slot that failed to open is allowed.
            unsafe { ffi::sl_close_camera(CAMERA_ID) };
            return Err(anyhow::Error::new(code).context(format!("failed to open {}", params.input)));
        }

        // SAFETY: the camera slot is open.
        let info = unsafe {
            CameraInformation {
                width: ffi::sl_get_width(CAMERA_ID).max(0) as u32,
                height: ffi::sl_get_height(CAMERA_ID).max(0) as u32,
                fps: ffi::sl_get_camera_fps(CAMERA_ID),
            }
        };

        Ok(Self {
            info,
            recording: matches!(params.input, InputSource::Recording(_)),
            runtime: ffi::SL_RuntimeParameters {
                reference_frame: ffi::SL_REFERENCE_FRAME_CAMERA,
                enable_depth: params.depth_mode != DepthMode::None,
                enable_fill_mode: false,
                confidence_threshold: 95,
                texture_confidence_threshold: 100,
                remove_saturated_areas: true,
            },
            mat: None,
        })
    }

    pub(super) fn information(&self) -> CameraInformation {
        self.info
    }

    pub(super) fn enable_streaming(
        &mut self,
        params: &StreamingParameters,
    ) -> Result<(), ErrorCode> {
        params.validate()?;
        // SAFETY: the camera slot is open.
        let status = unsafe {
            ffi::sl_enable_streaming(
                CAMERA_ID,
                codec_raw(params.codec),
                params.bitrate_kbps,
                params.port,
                params.gop_size,
                i32::from(params.adaptive_bitrate),
                i32::from(params.chunk_size),
                params.target_framerate as i32,
            )
        };
        ErrorCode::from_raw(status)
    }

    pub(super) fn disable_streaming(&mut self) {
        // SAFETY: the camera slot is open.
        unsafe { ffi::sl_disable_streaming(CAMERA_ID) }
    }

    pub(super) fn grab(&mut self) -> Result<(), ErrorCode> {
        // SAFETY: the camera slot is open and `runtime` outlives the call.
        let status = unsafe { ffi::sl_grab(CAMERA_ID, &mut self.runtime) };
        ErrorCode::from_raw(status)
    }

    pub(super) fn retrieve_image(&mut self, view: View, frame: &mut Frame) -> Result<(), ErrorCode> {
        let (width, height) = (self.info.width, self.info.height);
        let mat = match self.mat.take() {
            Some(mat) if mat.width == width && mat.height == height => mat,
            _ => SdkMat::new(width, height)?,
        };
        let mat = self.mat.insert(mat);

        // SAFETY: `mat` is a live CPU matrix sized for the camera resolution.
        let status = unsafe {
            ffi::sl_retrieve_image(
                CAMERA_ID,
                mat.ptr,
                view_raw(view),
                ffi::SL_MEM_CPU,
                width as i32,
                height as i32,
                std::ptr::null_mut(),
            )
        };
        ErrorCode::from_raw(status)?;

        // SAFETY: the matrix stays allocated while we copy out of it.
        let (data, step) = unsafe {
            (
                ffi::sl_mat_get_ptr(mat.ptr, ffi::SL_MEM_CPU),
                ffi::sl_mat_get_step_bytes(mat.ptr, ffi::SL_MEM_CPU).max(0) as usize,
            )
        };
        if data.is_null() {
            return Err(ErrorCode::Failure);
        }

        frame.reshape(width, height);
        let row_bytes = width as usize * BYTES_PER_PIXEL;
        if step < row_bytes {
            return Err(ErrorCode::Failure);
        }
        for (row, dst) in frame.bgra_mut().chunks_exact_mut(row_bytes).enumerate() {
            // SAFETY: the SDK guarantees `height` rows of `step` bytes each.
            let src = unsafe { std::slice::from_raw_parts(data.add(row * step), row_bytes) };
            dst.copy_from_slice(src);
        }
        frame.timestamp = self.image_timestamp();
        Ok(())
    }

    pub(super) fn replay_position(&self) -> Option<ReplayPosition> {
        if !self.recording {
            return None;
        }
        // SAFETY: the camera slot is open.
        let (position, total) = unsafe {
            (
                ffi::sl_get_svo_position(CAMERA_ID),
                ffi::sl_get_svo_number_of_frames(CAMERA_ID),
            )
        };
        Some(ReplayPosition {
            position: position.max(0) as u64,
            total: total.max(0) as u64,
        })
    }

    pub(super) fn image_timestamp(&self) -> Timestamp {
        // SAFETY: the camera slot is open.
        Timestamp::from_nanos(unsafe { ffi::sl_get_image_timestamp(CAMERA_ID) })
    }

    pub(super) fn close(&mut self) {
        self.mat = None;
        // SAFETY: closes the slot opened in `open`; `Camera` calls this once.
        unsafe { ffi::sl_close_camera(CAMERA_ID) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn devices_and_recordings_convert() -> Result<()> {
        let device = SdkInput::from_source(&InputSource::Device(2))?;
        assert_eq!(device.input_type, ffi::SL_INPUT_TYPE_USB);
        assert_eq!(device.device_id, 2);
        assert!(device.svo_path.is_none());

        let recording =
            SdkInput::from_source(&InputSource::Recording(PathBuf::from("/data/run.svo2")))?;
        assert_eq!(recording.input_type, ffi::SL_INPUT_TYPE_SVO);
        assert_eq!(
            recording.svo_path.as_deref().and_then(|p| p.to_str().ok()),
            Some("/data/run.svo2")
        );
        Ok(())
    }

    #[test]
    fn unusable_inputs_fail_before_the_sdk_is_touched() {
        assert!(SdkInput::from_source(&InputSource::Synthetic("stub://rec".to_string())).is_err());
        assert!(
            SdkInput::from_source(&InputSource::Recording(PathBuf::from("bad\0name.svo")))
                .is_err()
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_recording_paths_are_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = PathBuf::from(OsStr::from_bytes(b"rec\xff.svo"));
        let err = SdkInput::from_source(&InputSource::Recording(path))
            .err()
            .expect("conversion should fail");
        assert!(err.to_string().contains("UTF-8"));
    }
}

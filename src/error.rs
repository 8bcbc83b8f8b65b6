//! Status codes reported by the camera SDK.

use std::fmt;

/// Non-success status returned by an SDK call.
///
/// Raw values follow the ZED C API (`SL_ERROR_CODE`); `0` is success and is
/// never represented here.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    CameraRebooting,
    CorruptedFrame,
    Failure,
    NoGpuCompatible,
    NotEnoughGpuMemory,
    CameraNotDetected,
    InvalidResolution,
    LowUsbBandwidth,
    InvalidSvoFile,
    SvoRecordingError,
    EndOfSvoFileReached,
    SvoUnsupportedCompression,
    InvalidFunctionParameters,
    CameraNotInitialized,
    InvalidFunctionCall,
    CameraFailedToSetup,
    Other(i32),
}

impl ErrorCode {
    /// Map a raw C API return value. `0` means success.
    pub fn from_raw(raw: i32) -> Result<(), ErrorCode> {
        let code = match raw {
            0 => return Ok(()),
            -2 => ErrorCode::CorruptedFrame,
            -1 => ErrorCode::CameraRebooting,
            1 => ErrorCode::Failure,
            2 => ErrorCode::NoGpuCompatible,
            3 => ErrorCode::NotEnoughGpuMemory,
            4 => ErrorCode::CameraNotDetected,
            7 => ErrorCode::InvalidResolution,
            8 => ErrorCode::LowUsbBandwidth,
            11 => ErrorCode::InvalidSvoFile,
            12 => ErrorCode::SvoRecordingError,
            13 => ErrorCode::EndOfSvoFileReached,
            14 => ErrorCode::SvoUnsupportedCompression,
            17 => ErrorCode::InvalidFunctionParameters,
            19 => ErrorCode::CameraNotInitialized,
            21 => ErrorCode::InvalidFunctionCall,
            26 => ErrorCode::CameraFailedToSetup,
            other => ErrorCode::Other(other),
        };
        Err(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::CameraRebooting => "CAMERA REBOOTING",
            ErrorCode::CorruptedFrame => "CORRUPTED FRAME",
            ErrorCode::Failure => "FAILURE",
            ErrorCode::NoGpuCompatible => "NO GPU COMPATIBLE",
            ErrorCode::NotEnoughGpuMemory => "NOT ENOUGH GPU MEMORY",
            ErrorCode::CameraNotDetected => "CAMERA NOT DETECTED",
            ErrorCode::InvalidResolution => "INVALID RESOLUTION",
            ErrorCode::LowUsbBandwidth => "LOW USB BANDWIDTH",
            ErrorCode::InvalidSvoFile => "INVALID SVO FILE",
            ErrorCode::SvoRecordingError => "SVO RECORDING ERROR",
            ErrorCode::EndOfSvoFileReached => "END OF SVO FILE REACHED",
            ErrorCode::SvoUnsupportedCompression => "SVO UNSUPPORTED COMPRESSION",
            ErrorCode::InvalidFunctionParameters => "INVALID FUNCTION PARAMETERS",
            ErrorCode::CameraNotInitialized => "CAMERA NOT INITIALIZED",
            ErrorCode::InvalidFunctionCall => "INVALID FUNCTION CALL",
            ErrorCode::CameraFailedToSetup => "CAMERA FAILED TO SETUP",
            ErrorCode::Other(raw) => return write!(f, "ERROR CODE {}", raw),
        };
        f.write_str(name)
    }
}

impl std::error::Error for ErrorCode {}

//! ProjFS callback entry points.
//!
//! Each function recovers the [`CallbackContext`] from the instance context,
//! converts wide strings and flags, calls into [`DecoyCallbacks`] and maps the
//! result to an HRESULT.

use std::sync::Arc;

use canaryfs_model::Entry;
use windows::core::{GUID, HRESULT, PCWSTR};
use windows::Win32::Foundation::{
    BOOLEAN, ERROR_FILE_NOT_FOUND, ERROR_INSUFFICIENT_BUFFER, ERROR_NOT_ENOUGH_MEMORY, E_FAIL,
    S_OK,
};
use windows::Win32::Storage::FileSystem::{FILE_ATTRIBUTE_DIRECTORY, FILE_ATTRIBUTE_NORMAL};
use windows::Win32::Storage::ProjectedFileSystem::{
    PrjFillDirEntryBuffer, PrjWriteFileData, PrjWritePlaceholderInfo, PRJ_CALLBACKS,
    PRJ_CALLBACK_DATA, PRJ_CB_DATA_FLAG_ENUM_RESTART_SCAN,
    PRJ_CB_DATA_FLAG_ENUM_RETURN_SINGLE_ENTRY, PRJ_DIR_ENTRY_BUFFER_HANDLE, PRJ_FILE_BASIC_INFO,
    PRJ_NOTIFICATION, PRJ_NOTIFICATION_FILE_HANDLE_CLOSED_FILE_MODIFIED,
    PRJ_NOTIFICATION_FILE_OPENED, PRJ_NOTIFICATION_FILE_OVERWRITTEN,
    PRJ_NOTIFICATION_NEW_FILE_CREATED, PRJ_NOTIFICATION_PARAMETERS, PRJ_PLACEHOLDER_INFO,
};

use crate::callbacks::{
    CallbackStatus, DecoyCallbacks, DirEntrySink, EnumerationFlags, NotificationKind,
    PlaceholderInfo,
};
use crate::util::systemtime_to_filetime;
use crate::util::wstr::{optional_pcwstr, pcwstr_to_string, string_to_wide};
use crate::virtualizer::buffer::AlignedBuffer;

/// State reachable from every callback through `InstanceContext`.
pub struct CallbackContext {
    /// Provider protocol.
    pub callbacks: Arc<DecoyCallbacks>,
}

impl From<CallbackStatus> for HRESULT {
    fn from(status: CallbackStatus) -> Self {
        match status {
            CallbackStatus::Ok => S_OK,
            CallbackStatus::NotFound => HRESULT::from(ERROR_FILE_NOT_FOUND),
            CallbackStatus::InsufficientBuffer => HRESULT::from(ERROR_INSUFFICIENT_BUFFER),
        }
    }
}

/// Recover the callback context.
///
/// # Safety
/// `callback_data` must be the pointer ProjFS passed to a callback of an
/// instance started with a `CallbackContext` as its instance context.
unsafe fn context<'a>(callback_data: *const PRJ_CALLBACK_DATA) -> &'a CallbackContext {
    &*((*callback_data).InstanceContext as *const CallbackContext)
}

/// Relative path and triggering process of a callback.
unsafe fn request_paths(callback_data: *const PRJ_CALLBACK_DATA) -> Option<(String, String)> {
    let path: String = pcwstr_to_string((*callback_data).FilePathName).ok()?;
    let process: String =
        pcwstr_to_string((*callback_data).TriggeringProcessImageFileName).unwrap_or_default();
    Some((path, process))
}

fn basic_info(is_directory: bool, size: u64, filetime: i64) -> PRJ_FILE_BASIC_INFO {
    PRJ_FILE_BASIC_INFO {
        IsDirectory: BOOLEAN(is_directory as u8),
        FileSize: if is_directory { 0 } else { size as i64 },
        CreationTime: filetime,
        LastAccessTime: filetime,
        LastWriteTime: filetime,
        ChangeTime: filetime,
        FileAttributes: if is_directory {
            FILE_ATTRIBUTE_DIRECTORY.0
        } else {
            FILE_ATTRIBUTE_NORMAL.0
        },
    }
}

/// Sink writing into a ProjFS directory entry buffer.
struct ProjFsDirSink {
    handle: PRJ_DIR_ENTRY_BUFFER_HANDLE,
}

impl DirEntrySink for ProjFsDirSink {
    fn push(&mut self, entry: &Entry) -> bool {
        let name_wide = string_to_wide(&entry.name);
        let info: PRJ_FILE_BASIC_INFO = basic_info(
            entry.is_directory,
            entry.size,
            systemtime_to_filetime(entry.last_write),
        );

        let result = unsafe {
            PrjFillDirEntryBuffer(
                PCWSTR::from_raw(name_wide.as_ptr()),
                Some(&info as *const PRJ_FILE_BASIC_INFO),
                self.handle,
            )
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                if e.code() != HRESULT::from(ERROR_INSUFFICIENT_BUFFER) {
                    tracing::warn!(name = %entry.name, error = %e, "PrjFillDirEntryBuffer failed");
                }
                false
            }
        }
    }
}

// ============================================================================
// Callback Implementations
// ============================================================================

/// Start directory enumeration callback.
pub unsafe extern "system" fn start_dir_enum_cb(
    callback_data: *const PRJ_CALLBACK_DATA,
    enumeration_id: *const GUID,
) -> HRESULT {
    let ctx: &CallbackContext = context(callback_data);
    let dir: String = pcwstr_to_string((*callback_data).FilePathName).unwrap_or_default();

    ctx.callbacks
        .start_enumeration(&dir, (*enumeration_id).to_u128())
        .into()
}

/// End directory enumeration callback.
pub unsafe extern "system" fn end_dir_enum_cb(
    callback_data: *const PRJ_CALLBACK_DATA,
    enumeration_id: *const GUID,
) -> HRESULT {
    let ctx: &CallbackContext = context(callback_data);
    ctx.callbacks.end_enumeration((*enumeration_id).to_u128()).into()
}

/// Get directory enumeration callback.
pub unsafe extern "system" fn get_dir_enum_cb(
    callback_data: *const PRJ_CALLBACK_DATA,
    enumeration_id: *const GUID,
    search_expression: PCWSTR,
    dir_entry_buffer_handle: PRJ_DIR_ENTRY_BUFFER_HANDLE,
) -> HRESULT {
    let ctx: &CallbackContext = context(callback_data);

    let dir: String = match pcwstr_to_string((*callback_data).FilePathName) {
        Ok(p) => p,
        Err(_) => return E_FAIL,
    };
    let filter: Option<String> = optional_pcwstr(search_expression);

    let raw_flags = (*callback_data).Flags.0;
    let flags = EnumerationFlags {
        restart: raw_flags & PRJ_CB_DATA_FLAG_ENUM_RESTART_SCAN.0 != 0,
        single: raw_flags & PRJ_CB_DATA_FLAG_ENUM_RETURN_SINGLE_ENTRY.0 != 0,
    };

    let mut sink = ProjFsDirSink {
        handle: dir_entry_buffer_handle,
    };
    ctx.callbacks
        .get_directory_page(
            &dir,
            (*enumeration_id).to_u128(),
            filter.as_deref(),
            flags,
            &mut sink,
        )
        .into()
}

/// Get placeholder info callback.
pub unsafe extern "system" fn get_placeholder_info_cb(
    callback_data: *const PRJ_CALLBACK_DATA,
) -> HRESULT {
    let ctx: &CallbackContext = context(callback_data);

    let path: String = match pcwstr_to_string((*callback_data).FilePathName) {
        Ok(p) => p,
        Err(_) => return E_FAIL,
    };

    let Some(info) = ctx.callbacks.placeholder_info(&path) else {
        return CallbackStatus::NotFound.into();
    };

    write_placeholder(&*callback_data, &path, &info)
}

/// Get file data callback.
pub unsafe extern "system" fn get_file_data_cb(
    callback_data: *const PRJ_CALLBACK_DATA,
    byte_offset: u64,
    length: u32,
) -> HRESULT {
    let ctx: &CallbackContext = context(callback_data);

    let Some((path, process)) = request_paths(callback_data) else {
        return E_FAIL;
    };

    let Some(data) = ctx.callbacks.file_data(&path, byte_offset, length, &process) else {
        return CallbackStatus::NotFound.into();
    };
    if data.is_empty() {
        return S_OK;
    }

    let virtualization = (*callback_data).NamespaceVirtualizationContext;
    let Some(buffer) = AlignedBuffer::copy_from(virtualization, &data) else {
        return HRESULT::from(ERROR_NOT_ENOUGH_MEMORY);
    };

    match PrjWriteFileData(
        virtualization,
        &(*callback_data).DataStreamId,
        buffer.as_ptr(),
        byte_offset,
        buffer.len() as u32,
    ) {
        Ok(()) => S_OK,
        Err(e) => {
            tracing::error!(path = %path, error = %e, "PrjWriteFileData failed");
            e.code()
        }
    }
}

/// Query file name callback.
pub unsafe extern "system" fn query_file_name_cb(callback_data: *const PRJ_CALLBACK_DATA) -> HRESULT {
    let ctx: &CallbackContext = context(callback_data);

    let path: String = match pcwstr_to_string((*callback_data).FilePathName) {
        Ok(p) => p,
        Err(_) => return E_FAIL,
    };

    match ctx.callbacks.placeholder_info(&path) {
        Some(_) => S_OK,
        None => CallbackStatus::NotFound.into(),
    }
}

/// Notification callback.
///
/// Always returns S_OK so no file operation is ever vetoed.
pub unsafe extern "system" fn notification_cb(
    callback_data: *const PRJ_CALLBACK_DATA,
    is_directory: BOOLEAN,
    notification: PRJ_NOTIFICATION,
    _destination_file_name: PCWSTR,
    _operation_parameters: *mut PRJ_NOTIFICATION_PARAMETERS,
) -> HRESULT {
    let ctx: &CallbackContext = context(callback_data);

    let kind: NotificationKind = match notification {
        PRJ_NOTIFICATION_FILE_OPENED => NotificationKind::FileOpened,
        PRJ_NOTIFICATION_NEW_FILE_CREATED => NotificationKind::NewFileCreated,
        PRJ_NOTIFICATION_FILE_OVERWRITTEN => NotificationKind::FileOverwritten,
        PRJ_NOTIFICATION_FILE_HANDLE_CLOSED_FILE_MODIFIED => NotificationKind::FileModified,
        _ => return S_OK,
    };

    let Some((path, process)) = request_paths(callback_data) else {
        return S_OK;
    };

    ctx.callbacks
        .notify(&path, is_directory.as_bool(), kind, &process);
    S_OK
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Write placeholder metadata for a path.
///
/// # Arguments
/// * `data` - Callback data of the request
/// * `path` - Relative path exactly as ProjFS supplied it
/// * `info` - Metadata to write
fn write_placeholder(data: &PRJ_CALLBACK_DATA, path: &str, info: &PlaceholderInfo) -> HRESULT {
    let path_wide = string_to_wide(path);
    let placeholder_info = PRJ_PLACEHOLDER_INFO {
        FileBasicInfo: basic_info(
            info.is_directory,
            info.size,
            systemtime_to_filetime(info.last_write),
        ),
        ..Default::default()
    };

    unsafe {
        match PrjWritePlaceholderInfo(
            data.NamespaceVirtualizationContext,
            PCWSTR::from_raw(path_wide.as_ptr()),
            &placeholder_info,
            std::mem::size_of::<PRJ_PLACEHOLDER_INFO>() as u32,
        ) {
            Ok(()) => S_OK,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "PrjWritePlaceholderInfo failed");
                e.code()
            }
        }
    }
}

/// Build ProjFS callbacks structure.
pub fn build_callbacks() -> PRJ_CALLBACKS {
    PRJ_CALLBACKS {
        StartDirectoryEnumerationCallback: Some(start_dir_enum_cb),
        EndDirectoryEnumerationCallback: Some(end_dir_enum_cb),
        GetDirectoryEnumerationCallback: Some(get_dir_enum_cb),
        GetPlaceholderInfoCallback: Some(get_placeholder_info_cb),
        GetFileDataCallback: Some(get_file_data_cb),
        QueryFileNameCallback: Some(query_file_name_cb),
        NotificationCallback: Some(notification_cb),
        CancelCommandCallback: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_to_hresult() {
        assert_eq!(HRESULT::from(CallbackStatus::Ok), S_OK);
        assert_eq!(
            HRESULT::from(CallbackStatus::NotFound),
            HRESULT::from(ERROR_FILE_NOT_FOUND)
        );
        assert_eq!(
            HRESULT::from(CallbackStatus::InsufficientBuffer),
            HRESULT::from(ERROR_INSUFFICIENT_BUFFER)
        );
    }

    #[test]
    fn test_basic_info_directory_has_no_size() {
        let info: PRJ_FILE_BASIC_INFO = basic_info(true, 99, 7);
        assert_eq!(info.FileSize, 0);
        assert_eq!(info.FileAttributes, FILE_ATTRIBUTE_DIRECTORY.0);
        assert_eq!(info.CreationTime, 7);
        assert_eq!(info.ChangeTime, 7);
    }
}

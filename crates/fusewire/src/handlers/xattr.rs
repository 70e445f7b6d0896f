//! Extended-attribute sub-protocol.
//!
//! GETXATTR and LISTXATTR run in two phases. A request with size 0 asks
//! only for the value's length, answered in a [`GetXAttrOut`]. A sized
//! request gets the value itself as the whole reply body, or ERANGE when
//! the value is longer than the caller's buffer.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

use fusewire_abi::{GetXAttrIn, GetXAttrOut, Opcode, SetXAttrIn, Status};

use super::{input, reply};
use crate::dispatch::Dispatcher;
use crate::request::{Payload, Request};

/// Attributes answered with ENODATA when security labels are ignored.
const SECURITY_LABELS: [&str; 3] = [
    "security.capability",
    "system.posix_acl_access",
    "system.posix_acl_default",
];

fn is_security_label(name: &OsStr) -> bool {
    SECURITY_LABELS.iter().any(|label| name == OsStr::new(label))
}

/// Serves both GETXATTR and LISTXATTR.
pub(crate) fn get_xattr(d: &Dispatcher, req: &mut Request) {
    let Some(op) = req.opcode() else {
        req.set_status(Status::ENOSYS);
        return;
    };
    if d.options().ignore_security_labels
        && op == Opcode::GetXAttr
        && req.filename(0).is_some_and(is_security_label)
    {
        req.set_status(Status::ENODATA);
        return;
    }
    let Some(args) = input::<GetXAttrIn>(req) else {
        return;
    };
    let ctx = req.context();

    if args.size == 0 {
        let size = match (op, req.filename(0)) {
            (Opcode::GetXAttr, Some(name)) => d.fs().get_xattr_size(&ctx, name),
            (Opcode::ListXAttr, _) => d.fs().list_xattr(&ctx).map(|names| names.len() as u32),
            _ => Err(Status::EIO),
        };
        match size {
            Ok(size) => reply(req, Status::OK, &GetXAttrOut { size, padding: 0 }),
            Err(status) => req.set_status(status),
        }
        return;
    }

    req.clear_output();
    let data = match (op, req.filename(0)) {
        (Opcode::GetXAttr, Some(name)) => d.fs().get_xattr_data(&ctx, name),
        (Opcode::ListXAttr, _) => d.fs().list_xattr(&ctx),
        _ => Err(Status::EIO),
    };
    match data {
        Ok(data) if data.len() > args.size as usize => req.set_status(Status::ERANGE),
        Ok(data) => {
            req.set_payload(Payload::Data(data));
            req.set_status(Status::OK);
        }
        Err(status) => req.set_status(status),
    }
}

/// The body carries the attribute name, a NUL, then the value.
pub(crate) fn set_xattr(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<SetXAttrIn>(req) else {
        return;
    };
    let arg = req.arg();
    let status = match arg.iter().position(|&b| b == 0) {
        Some(end) => {
            let name = OsStr::from_bytes(&arg[..end]);
            let value = &arg[end + 1..];
            let value = &value[..value.len().min(args.size as usize)];
            d.fs().set_xattr(&req.context(), &args, name, value)
        }
        None => Status::EINVAL,
    };
    req.set_status(status);
}

pub(crate) fn remove_xattr(d: &Dispatcher, req: &mut Request) {
    let ctx = req.context();
    let status = req
        .filename(0)
        .map_or(Status::EIO, |name| d.fs().remove_xattr(&ctx, name));
    req.set_status(status);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_labels() {
        assert!(is_security_label(OsStr::new("security.capability")));
        assert!(is_security_label(OsStr::new("system.posix_acl_default")));
        assert!(!is_security_label(OsStr::new("security.selinux")));
        assert!(!is_security_label(OsStr::new("user.comment")));
    }
}

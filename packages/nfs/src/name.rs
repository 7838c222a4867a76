use crate::types::{NFS4_MAXNAMLEN, nfsstat4};

/// The checks [`utf8string_to_name`] applies beyond the length bounds.
#[derive(
	Clone, Copy, Debug, Default, PartialEq, Eq, derive_more::BitOr, derive_more::BitOrAssign,
)]
pub struct Scan(u32);

impl Scan {
	pub const NONE: Self = Self(0x00);
	pub const NO_SLASH: Self = Self(0x01);
	pub const NO_DOT: Self = Self(0x02);
	pub const CHECK_UTF8: Self = Self(0x04);
	pub const ALL: Self = Self(0x07);

	#[must_use]
	pub fn contains(self, other: Self) -> bool {
		self.0 & other.0 == other.0
	}
}

/// Validate a name received on the wire and convert it to a string.
///
/// The checks run front to back, so the status reflects the first offending byte. Without [`Scan::CHECK_UTF8`], invalid sequences are replaced rather than rejected.
pub fn utf8string_to_name(input: &[u8], scan: Scan) -> Result<String, nfsstat4> {
	if input.is_empty() {
		return Err(nfsstat4::NFS4ERR_INVAL);
	}
	if input.len() > NFS4_MAXNAMLEN {
		return Err(nfsstat4::NFS4ERR_NAMETOOLONG);
	}
	if scan.contains(Scan::NO_DOT) && matches!(input, b"." | b"..") {
		return Err(nfsstat4::NFS4ERR_BADNAME);
	}

	let slash = if scan.contains(Scan::NO_SLASH) {
		input.iter().position(|byte| *byte == b'/')
	} else {
		None
	};
	let invalid = match std::str::from_utf8(input) {
		Ok(_) => None,
		Err(error) if scan.contains(Scan::CHECK_UTF8) => Some(error.valid_up_to()),
		Err(_) => None,
	};
	match (slash, invalid) {
		(Some(slash), Some(invalid)) if invalid < slash => Err(nfsstat4::NFS4ERR_INVAL),
		(Some(_), _) => Err(nfsstat4::NFS4ERR_BADCHAR),
		(None, Some(_)) => Err(nfsstat4::NFS4ERR_INVAL),
		(None, None) => Ok(String::from_utf8_lossy(input).into_owned()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn valid() {
		assert_eq!(utf8string_to_name(b"hello", Scan::ALL).unwrap(), "hello");
		assert_eq!(
			utf8string_to_name("caf\u{e9}".as_bytes(), Scan::ALL).unwrap(),
			"caf\u{e9}"
		);
		assert_eq!(utf8string_to_name(b"...", Scan::ALL).unwrap(), "...");
		assert_eq!(utf8string_to_name(b".hidden", Scan::ALL).unwrap(), ".hidden");
	}

	#[test]
	fn length() {
		assert_eq!(
			utf8string_to_name(b"", Scan::NONE).unwrap_err(),
			nfsstat4::NFS4ERR_INVAL
		);
		let long = vec![b'a'; NFS4_MAXNAMLEN + 1];
		assert_eq!(
			utf8string_to_name(&long, Scan::NONE).unwrap_err(),
			nfsstat4::NFS4ERR_NAMETOOLONG
		);
		let max = vec![b'a'; NFS4_MAXNAMLEN];
		assert!(utf8string_to_name(&max, Scan::ALL).is_ok());
	}

	#[test]
	fn slash() {
		assert_eq!(
			utf8string_to_name(b"a/b", Scan::NO_SLASH).unwrap_err(),
			nfsstat4::NFS4ERR_BADCHAR
		);
		assert_eq!(utf8string_to_name(b"a/b", Scan::NO_DOT).unwrap(), "a/b");
	}

	#[test]
	fn dot() {
		for name in [&b"."[..], b".."] {
			assert_eq!(
				utf8string_to_name(name, Scan::NO_DOT).unwrap_err(),
				nfsstat4::NFS4ERR_BADNAME
			);
			assert!(utf8string_to_name(name, Scan::NO_SLASH).is_ok());
		}
	}

	#[test]
	fn utf8() {
		assert_eq!(
			utf8string_to_name(b"a\xffb", Scan::CHECK_UTF8).unwrap_err(),
			nfsstat4::NFS4ERR_INVAL
		);
		assert_eq!(
			utf8string_to_name(b"a\xffb", Scan::NONE).unwrap(),
			"a\u{fffd}b"
		);

		// The first offending byte decides the status.
		assert_eq!(
			utf8string_to_name(b"\xff/", Scan::ALL).unwrap_err(),
			nfsstat4::NFS4ERR_INVAL
		);
		assert_eq!(
			utf8string_to_name(b"/\xff", Scan::ALL).unwrap_err(),
			nfsstat4::NFS4ERR_BADCHAR
		);
	}
}

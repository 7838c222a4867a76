use super::{
	Access, Ace, Decode, DecodeFn, Encode, EncodeFn, Encoded, Entry, Mask, Outcome, Who,
	exclusive_create_bitmap, supported_up_to,
};
use crate::{
	export::Capability,
	name::{self, Scan},
	types::{
		ACE4_IDENTIFIER_GROUP, FH4_PERSISTENT, SET_TO_CLIENT_TIME4, SET_TO_SERVER_TIME4, nfs_fh4,
		nfs_ftype4, nfsace4, nfsstat4, nfstime4,
	},
	xdr::{self, Decoder, Encoder},
};
use num::ToPrimitive as _;

type Enc = Encoder<Vec<u8>>;

/// The smallest encoded ace: three words and an empty name.
const ACE_MIN_SIZE: usize = 16;

const R: Access = Access::READ;
const W: Access = Access::WRITE;
const RW: Access = Access::READ_WRITE;

impl Entry {
	const fn new(
		attr: u32,
		name: &'static str,
		size: usize,
		access: Access,
		encode: EncodeFn,
		decode: DecodeFn,
	) -> Self {
		Self {
			attr,
			name,
			supported: true,
			size,
			mask: Mask::NONE,
			exp_mask: Mask::NONE,
			access,
			encode,
			decode,
		}
	}

	const fn unsupported(attr: u32, name: &'static str, size: usize, access: Access) -> Self {
		Self {
			supported: false,
			..Self::new(attr, name, size, access, encode_noop, decode_noop)
		}
	}

	const fn mask(self, mask: Mask) -> Self {
		Self { mask, ..self }
	}

	const fn exp_mask(self, exp_mask: Mask) -> Self {
		Self { exp_mask, ..self }
	}
}

pub(super) static TABLE: [Entry; 81] = [
	Entry::new(0, "FATTR4_SUPPORTED_ATTRS", 0, R, encode_supported_attrs, decode_noop),
	Entry::new(1, "FATTR4_TYPE", 4, R, encode_type, decode_type).mask(Mask::TYPE),
	Entry::new(2, "FATTR4_FH_EXPIRE_TYPE", 4, R, encode_fh_expire_type, decode_noop),
	Entry::new(3, "FATTR4_CHANGE", 8, R, encode_change, decode_change)
		.mask(Mask::CHGTIME.union(Mask::CHANGE)),
	Entry::new(4, "FATTR4_SIZE", 8, RW, encode_size, decode_size).mask(Mask::SIZE),
	Entry::new(5, "FATTR4_LINK_SUPPORT", 4, R, encode_link_support, decode_noop),
	Entry::new(6, "FATTR4_SYMLINK_SUPPORT", 4, R, encode_symlink_support, decode_noop),
	Entry::new(7, "FATTR4_NAMED_ATTR", 4, R, encode_named_attr, decode_noop),
	Entry::new(8, "FATTR4_FSID", 16, R, encode_fsid, decode_fsid).mask(Mask::FSID),
	Entry::new(9, "FATTR4_UNIQUE_HANDLES", 4, R, encode_unique_handles, decode_noop),
	Entry::new(10, "FATTR4_LEASE_TIME", 4, R, encode_lease_time, decode_noop),
	Entry::new(11, "FATTR4_RDATTR_ERROR", 4, R, encode_rdattr_error, decode_rdattr_error),
	Entry::new(12, "FATTR4_ACL", 0, RW, encode_acl, decode_acl).mask(Mask::ACL),
	Entry::new(13, "FATTR4_ACLSUPPORT", 4, R, encode_aclsupport, decode_noop),
	Entry::new(14, "FATTR4_ARCHIVE", 4, RW, encode_false, decode_noop),
	Entry::new(15, "FATTR4_CANSETTIME", 4, R, encode_cansettime, decode_noop),
	Entry::new(16, "FATTR4_CASE_INSENSITIVE", 4, R, encode_case_insensitive, decode_noop),
	Entry::new(17, "FATTR4_CASE_PRESERVING", 4, R, encode_case_preserving, decode_noop),
	Entry::new(18, "FATTR4_CHOWN_RESTRICTED", 4, R, encode_chown_restricted, decode_noop),
	Entry::new(19, "FATTR4_FILEHANDLE", 0, R, encode_filehandle, decode_filehandle),
	Entry::new(20, "FATTR4_FILEID", 8, R, encode_fileid, decode_fileid).mask(Mask::FILEID),
	Entry::new(21, "FATTR4_FILES_AVAIL", 8, R, encode_files_avail, decode_files_avail),
	Entry::new(22, "FATTR4_FILES_FREE", 8, R, encode_files_free, decode_files_free),
	Entry::new(23, "FATTR4_FILES_TOTAL", 8, R, encode_files_total, decode_files_total),
	Entry::new(24, "FATTR4_FS_LOCATIONS", 0, R, encode_fs_locations, decode_noop),
	Entry::new(25, "FATTR4_HIDDEN", 4, RW, encode_false, decode_noop),
	Entry::new(26, "FATTR4_HOMOGENEOUS", 4, R, encode_homogeneous, decode_noop),
	Entry::new(27, "FATTR4_MAXFILESIZE", 8, R, encode_maxfilesize, decode_noop),
	Entry::new(28, "FATTR4_MAXLINK", 4, R, encode_maxlink, decode_noop),
	Entry::new(29, "FATTR4_MAXNAME", 4, R, encode_maxname, decode_noop),
	Entry::new(30, "FATTR4_MAXREAD", 8, R, encode_maxread, decode_noop),
	Entry::new(31, "FATTR4_MAXWRITE", 8, R, encode_maxwrite, decode_noop),
	Entry::unsupported(32, "FATTR4_MIMETYPE", 0, RW),
	Entry::new(33, "FATTR4_MODE", 4, RW, encode_mode, decode_mode).mask(Mask::MODE),
	Entry::new(34, "FATTR4_NO_TRUNC", 4, R, encode_no_trunc, decode_noop),
	Entry::new(35, "FATTR4_NUMLINKS", 4, R, encode_numlinks, decode_numlinks)
		.mask(Mask::NUMLINKS),
	Entry::new(36, "FATTR4_OWNER", 0, RW, encode_owner, decode_owner).mask(Mask::OWNER),
	Entry::new(37, "FATTR4_OWNER_GROUP", 0, RW, encode_owner_group, decode_owner_group)
		.mask(Mask::GROUP),
	Entry::unsupported(38, "FATTR4_QUOTA_AVAIL_HARD", 8, R),
	Entry::unsupported(39, "FATTR4_QUOTA_AVAIL_SOFT", 8, R),
	Entry::unsupported(40, "FATTR4_QUOTA_USED", 8, R),
	Entry::new(41, "FATTR4_RAWDEV", 8, R, encode_rawdev, decode_rawdev).mask(Mask::RAWDEV),
	Entry::new(42, "FATTR4_SPACE_AVAIL", 8, R, encode_space_avail, decode_space_avail),
	Entry::new(43, "FATTR4_SPACE_FREE", 8, R, encode_space_free, decode_space_free),
	Entry::new(44, "FATTR4_SPACE_TOTAL", 8, R, encode_space_total, decode_space_total),
	Entry::new(45, "FATTR4_SPACE_USED", 8, R, encode_space_used, decode_space_used)
		.mask(Mask::SPACEUSED),
	Entry::new(46, "FATTR4_SYSTEM", 4, RW, encode_false, decode_noop),
	Entry::new(47, "FATTR4_TIME_ACCESS", 12, R, encode_time_access, decode_time_access)
		.mask(Mask::ATIME),
	Entry::new(48, "FATTR4_TIME_ACCESS_SET", 0, W, encode_time_access_set, decode_time_access_set)
		.mask(Mask::ATIME)
		.exp_mask(Mask::ATIME_SERVER),
	Entry::unsupported(49, "FATTR4_TIME_BACKUP", 12, RW),
	Entry::unsupported(50, "FATTR4_TIME_CREATE", 12, RW),
	Entry::new(51, "FATTR4_TIME_DELTA", 12, R, encode_time_delta, decode_noop),
	Entry::new(52, "FATTR4_TIME_METADATA", 12, R, encode_time_metadata, decode_time_metadata)
		.mask(Mask::CTIME),
	Entry::new(53, "FATTR4_TIME_MODIFY", 12, R, encode_time_modify, decode_time_modify)
		.mask(Mask::MTIME),
	Entry::new(54, "FATTR4_TIME_MODIFY_SET", 0, W, encode_time_modify_set, decode_time_modify_set)
		.mask(Mask::MTIME)
		.exp_mask(Mask::MTIME_SERVER),
	Entry::new(55, "FATTR4_MOUNTED_ON_FILEID", 8, R, encode_mounted_on_fileid, decode_noop),
	Entry::unsupported(56, "FATTR4_DIR_NOTIF_DELAY", 12, R),
	Entry::unsupported(57, "FATTR4_DIRENT_NOTIF_DELAY", 12, R),
	Entry::unsupported(58, "FATTR4_DACL", 0, RW),
	Entry::unsupported(59, "FATTR4_SACL", 0, RW),
	Entry::unsupported(60, "FATTR4_CHANGE_POLICY", 16, R),
	Entry::unsupported(61, "FATTR4_FS_STATUS", 0, R),
	Entry::new(62, "FATTR4_FS_LAYOUT_TYPES", 0, R, encode_fs_layout_types, decode_noop),
	Entry::unsupported(63, "FATTR4_LAYOUT_HINT", 0, W),
	Entry::unsupported(64, "FATTR4_LAYOUT_TYPES", 0, R),
	Entry::new(65, "FATTR4_LAYOUT_BLKSIZE", 4, R, encode_layout_blksize, decode_noop),
	Entry::unsupported(66, "FATTR4_LAYOUT_ALIGNMENT", 4, R),
	Entry::unsupported(67, "FATTR4_FS_LOCATIONS_INFO", 0, R),
	Entry::unsupported(68, "FATTR4_MDSTHRESHOLD", 0, R),
	Entry::unsupported(69, "FATTR4_RETENTION_GET", 0, R),
	Entry::unsupported(70, "FATTR4_RETENTION_SET", 0, W),
	Entry::unsupported(71, "FATTR4_RETENTEVT_GET", 0, R),
	Entry::unsupported(72, "FATTR4_RETENTEVT_SET", 0, W),
	Entry::unsupported(73, "FATTR4_RETENTION_HOLD", 8, RW),
	Entry::unsupported(74, "FATTR4_MODE_SET_MASKED", 8, W),
	Entry::new(75, "FATTR4_SUPPATTR_EXCLCREAT", 0, R, encode_suppattr_exclcreat, decode_noop),
	Entry::unsupported(76, "FATTR4_FS_CHARSET_CAP", 4, R),
	Entry::unsupported(77, "FATTR4_CLONE_BLKSIZE", 4, R),
	Entry::unsupported(78, "FATTR4_SPACE_FREED", 8, R),
	Entry::unsupported(79, "FATTR4_CHANGE_ATTR_TYPE", 4, R),
	Entry::unsupported(80, "FATTR4_SEC_LABEL", 0, R),
];

fn encode_noop(_: &mut Enc, _: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	Ok(Encoded::Noop)
}

fn decode_noop(_: &mut Decoder<'_>, _: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	Ok(Outcome::Noop)
}

fn encode_supported_attrs(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode(&supported_up_to(state.max_attr))?;
	Ok(Encoded::Success)
}

fn encode_type(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	let type_ = state.args.attrs.type_;
	match type_ {
		Some(nfs_ftype4::NF4ATTRDIR | nfs_ftype4::NF4NAMEDATTR) | None => {
			Err(xdr::Error::Custom(format!("invalid file type {type_:?}")))
		},
		Some(type_) => {
			encoder.encode(&type_)?;
			Ok(Encoded::Success)
		},
	}
}

fn decode_type(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	let type_ = decoder.decode::<nfs_ftype4>()?;
	if matches!(type_, nfs_ftype4::NF4ATTRDIR | nfs_ftype4::NF4NAMEDATTR) {
		return Err(nfsstat4::NFS4ERR_BADXDR);
	}
	state.decoded.attrs.type_ = Some(type_);
	Ok(Outcome::Success)
}

fn encode_fh_expire_type(encoder: &mut Enc, _: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode_uint(FH4_PERSISTENT)?;
	Ok(Encoded::Success)
}

fn encode_change(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode_uhyper(state.args.attrs.change)?;
	Ok(Encoded::Success)
}

fn decode_change(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	let change = decoder.decode_uhyper()?;
	let attrs = &mut state.decoded.attrs;
	attrs.change = change;
	attrs.chgtime = nfstime4 {
		seconds: (change & 0xFFFF_FFFF).to_i64().unwrap_or_default(),
		nseconds: 0,
	};
	Ok(Outcome::Success)
}

fn encode_size(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode_uhyper(state.args.attrs.size)?;
	Ok(Encoded::Success)
}

fn decode_size(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.attrs.size = decoder.decode_uhyper()?;
	Ok(Outcome::Success)
}

fn encode_capability(
	encoder: &mut Enc,
	state: &Encode<'_>,
	capability: Capability,
) -> Result<Encoded, xdr::Error> {
	let value = state
		.export()
		.is_some_and(|export| export.supports(capability));
	encoder.encode_bool(value)?;
	Ok(Encoded::Success)
}

fn encode_link_support(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encode_capability(encoder, state, Capability::LinkSupport)
}

fn encode_symlink_support(
	encoder: &mut Enc,
	state: &mut Encode<'_>,
) -> Result<Encoded, xdr::Error> {
	encode_capability(encoder, state, Capability::SymlinkSupport)
}

fn encode_named_attr(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encode_capability(encoder, state, Capability::NamedAttr)
}

fn encode_unique_handles(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encode_capability(encoder, state, Capability::UniqueHandles)
}

fn encode_cansettime(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encode_capability(encoder, state, Capability::CanSetTime)
}

fn encode_case_insensitive(
	encoder: &mut Enc,
	state: &mut Encode<'_>,
) -> Result<Encoded, xdr::Error> {
	encode_capability(encoder, state, Capability::CaseInsensitive)
}

fn encode_case_preserving(
	encoder: &mut Enc,
	state: &mut Encode<'_>,
) -> Result<Encoded, xdr::Error> {
	encode_capability(encoder, state, Capability::CasePreserving)
}

fn encode_chown_restricted(
	encoder: &mut Enc,
	state: &mut Encode<'_>,
) -> Result<Encoded, xdr::Error> {
	encode_capability(encoder, state, Capability::ChownRestricted)
}

fn encode_homogeneous(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encode_capability(encoder, state, Capability::Homogeneous)
}

fn encode_no_trunc(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encode_capability(encoder, state, Capability::NoTrunc)
}

fn encode_false(encoder: &mut Enc, _: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode_bool(false)?;
	Ok(Encoded::Success)
}

fn encode_fsid(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	let fsid = state
		.export()
		.and_then(|export| export.fsid())
		.unwrap_or(state.args.attrs.fsid);
	encoder.encode(&fsid)?;
	Ok(Encoded::Success)
}

fn decode_fsid(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.attrs.fsid = decoder.decode()?;
	Ok(Outcome::Success)
}

fn encode_lease_time(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	let seconds = state.config.lease_time.as_secs().to_u32().unwrap_or(u32::MAX);
	encoder.encode_uint(seconds)?;
	Ok(Encoded::Success)
}

fn encode_rdattr_error(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode(&state.args.rdattr_error)?;
	Ok(Encoded::Success)
}

fn decode_rdattr_error(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.rdattr_error = Some(decoder.decode()?);
	Ok(Outcome::Success)
}

fn encode_acl(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	let Some(acl) = &state.args.attrs.acl else {
		encoder.encode_uint(0)?;
		return Ok(Encoded::Success);
	};
	encoder.encode_length(acl.len())?;
	for ace in acl {
		let who = match ace.who {
			Who::Uid(uid) => name_from_id(state, Principal::User, uid),
			Who::Gid(gid) => name_from_id(state, Principal::Group, gid),
			special => special.special_name().unwrap_or_default().to_owned(),
		};
		encoder.encode(&nfsace4 {
			type_: ace.type_,
			flag: ace.flag,
			access_mask: ace.access_mask,
			who,
		})?;
	}
	Ok(Encoded::Success)
}

fn decode_acl(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	let count = decoder.decode_length()?;
	let mut acl = Vec::with_capacity(count.min(decoder.remaining() / ACE_MIN_SIZE));
	for _ in 0..count {
		let nfsace4 {
			type_,
			flag,
			access_mask,
			who,
		} = decoder.decode()?;
		let (flag, who) = if let Some(special) = Who::special(&who) {
			(flag & !ACE4_IDENTIFIER_GROUP, special)
		} else if flag & ACE4_IDENTIFIER_GROUP != 0 {
			(flag, Who::Gid(id_from_name(state, Principal::Group, &who)?))
		} else {
			(flag, Who::Uid(id_from_name(state, Principal::User, &who)?))
		};
		acl.push(Ace {
			type_,
			flag,
			access_mask,
			who,
		});
	}
	state.decoded.attrs.acl = Some(acl);
	Ok(Outcome::Success)
}

fn encode_aclsupport(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	let value = state.export().map_or(0, |export| export.acl_support());
	encoder.encode_uint(value)?;
	Ok(Encoded::Success)
}

fn encode_filehandle(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	let Some(file_handle) = state.args.file_handle else {
		return Err(xdr::Error::Custom("no file handle".to_owned()));
	};
	encoder.encode(file_handle)?;
	Ok(Encoded::Success)
}

fn decode_filehandle(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.file_handle = Some(decoder.decode::<nfs_fh4>()?);
	Ok(Outcome::Success)
}

fn encode_fileid(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode_uhyper(state.args.attrs.fileid)?;
	Ok(Encoded::Success)
}

fn decode_fileid(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.attrs.fileid = decoder.decode_uhyper()?;
	Ok(Outcome::Success)
}

fn encode_files_avail(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode_uhyper(state.fsinfo()?.avail_files)?;
	Ok(Encoded::Success)
}

fn decode_files_avail(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.fsinfo.avail_files = decoder.decode_uhyper()?;
	Ok(Outcome::Success)
}

fn encode_files_free(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode_uhyper(state.fsinfo()?.free_files)?;
	Ok(Encoded::Success)
}

fn decode_files_free(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.fsinfo.free_files = decoder.decode_uhyper()?;
	Ok(Outcome::Success)
}

fn encode_files_total(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode_uhyper(state.fsinfo()?.total_files)?;
	Ok(Encoded::Success)
}

fn decode_files_total(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.fsinfo.total_files = decoder.decode_uhyper()?;
	Ok(Outcome::Success)
}

fn encode_fs_locations(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	if state.args.attrs.type_ != Some(nfs_ftype4::NF4DIR) {
		return Ok(Encoded::Noop);
	}
	let Some(locations) = state.export().and_then(|export| export.fs_locations()) else {
		return Ok(Encoded::Noop);
	};
	encoder.encode(&locations)?;
	Ok(Encoded::Success)
}

fn encode_maxfilesize(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	let value = state.export().map_or(0, |export| export.max_file_size());
	encoder.encode_uhyper(value)?;
	Ok(Encoded::Success)
}

fn encode_maxlink(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	let value = state.export().map_or(0, |export| export.max_link());
	encoder.encode_uint(value)?;
	Ok(Encoded::Success)
}

fn encode_maxname(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	let value = state.export().map_or(0, |export| export.max_name_len());
	encoder.encode_uint(value)?;
	Ok(Encoded::Success)
}

fn encode_maxread(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	let value = state.export().map_or(0, |export| export.max_read());
	encoder.encode_uhyper(value)?;
	Ok(Encoded::Success)
}

fn encode_maxwrite(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	let value = state.export().map_or(0, |export| export.max_write());
	encoder.encode_uhyper(value)?;
	Ok(Encoded::Success)
}

fn encode_mode(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode_uint(state.args.attrs.mode & 0o7777)?;
	Ok(Encoded::Success)
}

fn decode_mode(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.attrs.mode = decoder.decode_uint()? & 0o7777;
	Ok(Outcome::Success)
}

fn encode_numlinks(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode_uint(state.args.attrs.numlinks)?;
	Ok(Encoded::Success)
}

fn decode_numlinks(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.attrs.numlinks = decoder.decode_uint()?;
	Ok(Outcome::Success)
}

fn encode_owner(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	let name = name_from_id(state, Principal::User, state.args.attrs.owner);
	encoder.encode_str(&name)?;
	Ok(Encoded::Success)
}

fn decode_owner(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.attrs.owner = decode_principal(decoder, state, Principal::User)?;
	Ok(Outcome::Success)
}

fn encode_owner_group(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	let name = name_from_id(state, Principal::Group, state.args.attrs.group);
	encoder.encode_str(&name)?;
	Ok(Encoded::Success)
}

fn decode_owner_group(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.attrs.group = decode_principal(decoder, state, Principal::Group)?;
	Ok(Outcome::Success)
}

fn encode_rawdev(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode(&state.args.attrs.rawdev)?;
	Ok(Encoded::Success)
}

fn decode_rawdev(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.attrs.rawdev = decoder.decode()?;
	Ok(Outcome::Success)
}

fn encode_space_avail(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode_uhyper(state.fsinfo()?.avail_bytes)?;
	Ok(Encoded::Success)
}

fn decode_space_avail(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.fsinfo.avail_bytes = decoder.decode_uhyper()?;
	Ok(Outcome::Success)
}

fn encode_space_free(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode_uhyper(state.fsinfo()?.free_bytes)?;
	Ok(Encoded::Success)
}

fn decode_space_free(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.fsinfo.free_bytes = decoder.decode_uhyper()?;
	Ok(Outcome::Success)
}

fn encode_space_total(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode_uhyper(state.fsinfo()?.total_bytes)?;
	Ok(Encoded::Success)
}

fn decode_space_total(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.fsinfo.total_bytes = decoder.decode_uhyper()?;
	Ok(Outcome::Success)
}

fn encode_space_used(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode_uhyper(state.args.attrs.spaceused)?;
	Ok(Encoded::Success)
}

fn decode_space_used(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.attrs.spaceused = decoder.decode_uhyper()?;
	Ok(Outcome::Success)
}

fn decode_time(decoder: &mut Decoder<'_>) -> Result<nfstime4, nfsstat4> {
	let time = decoder.decode::<nfstime4>()?;
	if time.nseconds >= 1_000_000_000 {
		return Err(nfsstat4::NFS4ERR_INVAL);
	}
	Ok(time)
}

/// Decode a settime4. `None` means the server's time.
fn decode_settime(decoder: &mut Decoder<'_>) -> Result<Option<nfstime4>, nfsstat4> {
	match decoder.decode_uint()? {
		SET_TO_SERVER_TIME4 => Ok(None),
		SET_TO_CLIENT_TIME4 => Ok(Some(decode_time(decoder)?)),
		_ => Err(nfsstat4::NFS4ERR_BADXDR),
	}
}

fn encode_settime(
	encoder: &mut Enc,
	time: nfstime4,
	server: bool,
) -> Result<Encoded, xdr::Error> {
	if server {
		encoder.encode_uint(SET_TO_SERVER_TIME4)?;
	} else {
		encoder.encode_uint(SET_TO_CLIENT_TIME4)?;
		encoder.encode(&time)?;
	}
	Ok(Encoded::Success)
}

fn encode_time_access(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode(&state.args.attrs.atime)?;
	Ok(Encoded::Success)
}

fn decode_time_access(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.attrs.atime = decode_time(decoder)?;
	Ok(Outcome::Success)
}

fn encode_time_access_set(
	encoder: &mut Enc,
	state: &mut Encode<'_>,
) -> Result<Encoded, xdr::Error> {
	let attrs = state.args.attrs;
	encode_settime(encoder, attrs.atime, attrs.mask.contains(Mask::ATIME_SERVER))
}

fn decode_time_access_set(
	decoder: &mut Decoder<'_>,
	state: &mut Decode<'_>,
) -> Result<Outcome, nfsstat4> {
	match decode_settime(decoder)? {
		Some(time) => {
			state.decoded.attrs.atime = time;
			Ok(Outcome::Success)
		},
		None => Ok(Outcome::SuccessExp),
	}
}

fn encode_time_delta(encoder: &mut Enc, _: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	let delta = nfstime4 {
		seconds: 1,
		nseconds: 0,
	};
	encoder.encode(&delta)?;
	Ok(Encoded::Success)
}

fn encode_time_metadata(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode(&state.args.attrs.ctime)?;
	Ok(Encoded::Success)
}

fn decode_time_metadata(
	decoder: &mut Decoder<'_>,
	state: &mut Decode<'_>,
) -> Result<Outcome, nfsstat4> {
	state.decoded.attrs.ctime = decode_time(decoder)?;
	Ok(Outcome::Success)
}

fn encode_time_modify(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	encoder.encode(&state.args.attrs.mtime)?;
	Ok(Encoded::Success)
}

fn decode_time_modify(decoder: &mut Decoder<'_>, state: &mut Decode<'_>) -> Result<Outcome, nfsstat4> {
	state.decoded.attrs.mtime = decode_time(decoder)?;
	Ok(Outcome::Success)
}

fn encode_time_modify_set(
	encoder: &mut Enc,
	state: &mut Encode<'_>,
) -> Result<Encoded, xdr::Error> {
	let attrs = state.args.attrs;
	encode_settime(encoder, attrs.mtime, attrs.mask.contains(Mask::MTIME_SERVER))
}

fn decode_time_modify_set(
	decoder: &mut Decoder<'_>,
	state: &mut Decode<'_>,
) -> Result<Outcome, nfsstat4> {
	match decode_settime(decoder)? {
		Some(time) => {
			state.decoded.attrs.mtime = time;
			Ok(Outcome::Success)
		},
		None => Ok(Outcome::SuccessExp),
	}
}

fn encode_mounted_on_fileid(
	encoder: &mut Enc,
	state: &mut Encode<'_>,
) -> Result<Encoded, xdr::Error> {
	encoder.encode_uhyper(state.args.mounted_on_fileid)?;
	Ok(Encoded::Success)
}

fn encode_fs_layout_types(
	encoder: &mut Enc,
	state: &mut Encode<'_>,
) -> Result<Encoded, xdr::Error> {
	let Some(export) = state.export() else {
		return Ok(Encoded::Noop);
	};
	encoder.encode(&export.layout_types())?;
	Ok(Encoded::Success)
}

fn encode_layout_blksize(encoder: &mut Enc, state: &mut Encode<'_>) -> Result<Encoded, xdr::Error> {
	let Some(export) = state.export() else {
		return Ok(Encoded::Noop);
	};
	encoder.encode_uint(export.layout_blocksize())?;
	Ok(Encoded::Success)
}

fn encode_suppattr_exclcreat(
	encoder: &mut Enc,
	_: &mut Encode<'_>,
) -> Result<Encoded, xdr::Error> {
	encoder.encode(&exclusive_create_bitmap())?;
	Ok(Encoded::Success)
}

#[derive(Clone, Copy, Debug)]
enum Principal {
	User,
	Group,
}

/// The owner string for an id. Without a mapping the id is written as a decimal number.
fn name_from_id(state: &Encode<'_>, principal: Principal, id: u32) -> String {
	state
		.export()
		.and_then(|export| match principal {
			Principal::User => export.uid_to_name(id),
			Principal::Group => export.gid_to_name(id),
		})
		.unwrap_or_else(|| id.to_string())
}

/// Map an owner string to an id, falling back to numeric names and then to the export's anonymous id.
fn id_from_name(state: &Decode<'_>, principal: Principal, name: &str) -> Result<u32, nfsstat4> {
	let export = state.export();
	let mapped = export.and_then(|export| match principal {
		Principal::User => export.name_to_uid(name),
		Principal::Group => export.name_to_gid(name),
	});
	if let Some(id) = mapped {
		return Ok(id);
	}
	if state.config.allow_numeric_owners
		&& let Ok(id) = name.parse::<u32>()
	{
		return Ok(id);
	}
	let anonymous = export.and_then(|export| match principal {
		Principal::User => export.anonymous_uid(),
		Principal::Group => export.anonymous_gid(),
	});
	anonymous.ok_or_else(|| {
		tracing::debug!(?principal, name, "failed to map the name");
		nfsstat4::NFS4ERR_BADOWNER
	})
}

fn decode_principal(
	decoder: &mut Decoder<'_>,
	state: &Decode<'_>,
	principal: Principal,
) -> Result<u32, nfsstat4> {
	let bytes = decoder.decode_opaque()?;
	let name = name::utf8string_to_name(bytes, Scan::CHECK_UTF8).map_err(|status| {
		tracing::debug!(?principal, %status, "invalid name");
		nfsstat4::NFS4ERR_BADOWNER
	})?;
	id_from_name(state, principal, &name)
}

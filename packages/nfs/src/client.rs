use crate::types::{clientid4, nfsstat4};
use num::ToPrimitive as _;
use std::sync::{Arc, atomic::AtomicU32};

/// The client and lease bookkeeping that stateid validation touches.
pub trait Clients: Send + Sync {
	/// Look up a confirmed client. Unknown or unconfirmed clients produce the status to return.
	fn lookup_confirmed_client(&self, clientid: clientid4) -> Result<Arc<dyn Client>, nfsstat4>;
}

pub trait Client: Send + Sync + std::fmt::Debug {
	fn clientid(&self) -> clientid4;

	/// The counter used to mint the last four bytes of this client's stateids.
	fn state_counter(&self) -> &AtomicU32;

	/// Reserve the lease. Returns false if the lease has already expired. Must not block.
	fn reserve_lease(&self) -> bool;

	/// Drop a reservation taken with [`Client::reserve_lease`] and renew the lease.
	fn release_lease(&self);
}

#[must_use]
pub fn clientid(epoch: u32, counter: u32) -> clientid4 {
	(u64::from(epoch) << 32) | u64::from(counter)
}

#[must_use]
pub fn clientid_epoch(clientid: clientid4) -> u32 {
	(clientid >> 32).to_u32().unwrap_or_default()
}

#[must_use]
pub fn clientid_counter(clientid: clientid4) -> u32 {
	(clientid & 0xFFFF_FFFF).to_u32().unwrap_or_default()
}

pub(crate) fn same_client(a: &dyn Client, b: &dyn Client) -> bool {
	a.clientid() == b.clientid()
}

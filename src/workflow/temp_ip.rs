//! Temporary address staging.
//!
//! The target address may still sit on the NIC being replaced, so the new NIC
//! is created with a throwaway address and moved to the target only after the
//! old NIC is gone.

use crate::azure::ControlPlane;
use crate::config::{FALLBACK_HOST_MAX, FALLBACK_HOST_MIN, FALLBACK_PREFIX_LEN};
use crate::models::Ipv4;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempIpSource {
    /// Offered by the provider's available address list.
    Provider,
    /// Derived from the VM name, availability not checked.
    Fallback,
}

/// FNV-1a, stable across runs and platforms.
fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0x811c_9dc5u32, |hash, b| {
        (hash ^ u32::from(*b)).wrapping_mul(0x0100_0193)
    })
}

/// Deterministic address inside the target's /24, host part in 100..=199.
///
/// Skips the target itself so the staged address never equals it.
pub fn fallback_ip(vm_name: &str, target: Ipv4Addr) -> Ipv4Addr {
    let span = u32::from(FALLBACK_HOST_MAX - FALLBACK_HOST_MIN) + 1;
    let network = Ipv4 {
        addr: target,
        mask: FALLBACK_PREFIX_LEN,
    };
    let mut offset = fnv1a(vm_name.as_bytes()) % span;
    loop {
        let host = u32::from(FALLBACK_HOST_MIN) + offset;
        match network.nth_host(host) {
            Some(ip) if ip != target => return ip,
            _ => offset = (offset + 1) % span,
        }
    }
}

/// First provider-offered address that is not the target, else the fallback.
pub fn choose_temporary_ip<C: ControlPlane + ?Sized>(
    client: &C,
    subnet_id: &str,
    vm_name: &str,
    target: Ipv4Addr,
) -> (Ipv4Addr, TempIpSource) {
    match client.list_available_ips(subnet_id) {
        Ok(ips) => {
            if let Some(ip) = ips.into_iter().find(|ip| *ip != target) {
                log::info!("Temporary IP for {vm_name}: {ip} (offered by subnet)");
                return (ip, TempIpSource::Provider);
            }
            log::warn!("Subnet offered no usable address for {vm_name}");
        }
        Err(e) => log::warn!("Could not list available IPs for {vm_name}: {e}"),
    }
    let ip = fallback_ip(vm_name, target);
    log::warn!("Temporary IP for {vm_name}: {ip} (hash fallback, not verified)");
    (ip, TempIpSource::Fallback)
}

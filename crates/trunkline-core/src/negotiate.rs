//! Configure-Request contents: what we offer and what we absorb.
//!
//! Builders produce the option bytes for our outgoing requests; `absorb`
//! folds a peer request's options into the incoming option set. Any tag we
//! do not recognise fails the whole request — this core rejects rather
//! than emitting a Configure-Reject, so a surviving request is always
//! echoed back verbatim as a Configure-Ack.

use std::net::Ipv4Addr;

use tracing::debug;
use trunkline_proto::{
    ConfigOption, Protocol,
    options::{self, ip6cp, ipcp, lcp},
};

use crate::{
    error::SessionError,
    link::{IpConfig, LinkOptions},
};

fn encode(opts: &[ConfigOption]) -> Vec<u8> {
    let mut body = Vec::with_capacity(options::encoded_len(opts));
    // The builders only emit fixed-width values, far below the option
    // size limit.
    let encoded = options::encode_options(opts, &mut body);
    debug_assert!(encoded.is_ok());
    body
}

/// Option bytes for our LCP Configure-Request.
pub(crate) fn lcp_request(ip: &IpConfig, magic: [u8; 4], default_mtu: u16) -> Vec<u8> {
    encode(&[
        ConfigOption::with_u16(lcp::MRU, ip.mtu.unwrap_or(default_mtu)),
        // We need no escaping on receive.
        ConfigOption::with_u32(lcp::ASYNCMAP, 0),
        ConfigOption::with_bytes(lcp::MAGIC, &magic),
        ConfigOption::flag(lcp::PFCOMP),
        ConfigOption::flag(lcp::ACCOMP),
    ])
}

/// Option bytes for our IPCP Configure-Request.
pub(crate) fn ipcp_request(ip: &IpConfig) -> Vec<u8> {
    let addr = ip.addr_v4.unwrap_or(Ipv4Addr::UNSPECIFIED);
    encode(&[ConfigOption::with_bytes(ipcp::ADDRESS, &addr.octets())])
}

/// Option bytes for our IP6CP Configure-Request.
pub(crate) fn ip6cp_request(ip: &IpConfig) -> Vec<u8> {
    encode(&[ConfigOption::with_bytes(ip6cp::INTERFACE_ID, &ip.interface_id())])
}

/// Fold the options of a peer Configure-Request into the incoming set.
///
/// # Errors
///
/// [`SessionError::InvalidOptions`] on the first malformed or
/// unrecognised option; nothing absorbed before the failure is rolled
/// back (the session terminates anyway).
pub(crate) fn absorb(
    protocol: Protocol,
    body: &[u8],
    inn: &mut LinkOptions,
    ip: &mut IpConfig,
) -> Result<(), SessionError> {
    let invalid = || SessionError::InvalidOptions { protocol };
    let parsed = options::decode_options(body).map_err(|err| {
        debug!(%err, ?protocol, "malformed configure request options");
        invalid()
    })?;

    for opt in &parsed {
        match protocol {
            Protocol::Lcp => absorb_lcp(opt, inn, ip).ok_or_else(invalid)?,
            Protocol::Ipcp => absorb_ipcp(opt, inn).ok_or_else(invalid)?,
            Protocol::Ip6cp => absorb_ip6cp(opt, inn).ok_or_else(invalid)?,
            Protocol::Ipv4 | Protocol::Ipv6 => return Err(invalid()),
        }
    }

    Ok(())
}

fn absorb_lcp(opt: &ConfigOption, inn: &mut LinkOptions, ip: &mut IpConfig) -> Option<()> {
    match opt.tag {
        lcp::MRU => ip.mtu = Some(opt.as_u16()?),
        lcp::ASYNCMAP => inn.asyncmap = opt.as_u32()?,
        lcp::MAGIC => {
            let bytes: [u8; 4] = opt.value.as_slice().try_into().ok()?;
            inn.magic = Some(bytes);
        }
        lcp::PFCOMP => inn.flags.set_pfcomp(),
        lcp::ACCOMP => inn.flags.set_accomp(),
        _ => {
            debug!(tag = opt.tag, "unrecognised LCP option");
            return None;
        }
    }
    Some(())
}

fn absorb_ipcp(opt: &ConfigOption, inn: &mut LinkOptions) -> Option<()> {
    match opt.tag {
        ipcp::COMPRESSION => {
            // Only Van Jacobson is recognised, and only recorded: traffic
            // is never VJ-compressed.
            let value: [u8; 2] = opt.value.get(..2)?.try_into().ok()?;
            if u16::from_be_bytes(value) != options::VJ_COMPRESSION {
                debug!(value = u16::from_be_bytes(value), "unrecognised IP compression protocol");
                return None;
            }
            inn.flags.set_vjcomp();
        }
        ipcp::ADDRESS => {
            let octets: [u8; 4] = opt.value.as_slice().try_into().ok()?;
            inn.addr_v4 = Some(Ipv4Addr::from(octets));
        }
        _ => {
            debug!(tag = opt.tag, "unrecognised IPCP option");
            return None;
        }
    }
    Some(())
}

fn absorb_ip6cp(opt: &ConfigOption, inn: &mut LinkOptions) -> Option<()> {
    match opt.tag {
        ip6cp::INTERFACE_ID => {
            let ifid: [u8; 8] = opt.value.as_slice().try_into().ok()?;
            inn.ifid_v6 = Some(ifid);
        }
        _ => {
            debug!(tag = opt.tag, "unrecognised IP6CP option");
            return None;
        }
    }
    Some(())
}

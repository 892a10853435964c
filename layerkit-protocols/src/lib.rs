//! Protocol registrations for layerkit
//!
//! Each module defines one protocol's header schema, its binding rules, and
//! the explicit length/checksum fixup routines its wire format calls for.
//! Nothing here is auto-maintained: a checksum or length field holds
//! whatever the last fixup call wrote.
//!
//! [`registry()`] performs the one-shot startup registration. Binding rules
//! fire first-registered-wins, so the registration order below is part of
//! the observable contract and must not be reshuffled.

pub mod arp;
pub mod ethernet;
pub mod http;
pub mod icmpv6;
pub mod ipv4;
pub mod ipv6;
pub mod mld;
pub mod tcp;
pub mod udp;

use layerkit_engine::checksum::{pseudo_sum_v4, pseudo_sum_v6};
use layerkit_engine::{Header, Registry};
use layerkit_core::{Error, Result};

/// Build the full protocol registry
///
/// This is the explicit startup phase: after it returns, the registry is
/// read-only and may be shared freely across concurrent dissection and
/// construction calls.
pub fn registry() -> Registry {
    let mut reg = Registry::new();
    ethernet::register(&mut reg);
    arp::register(&mut reg);
    ipv4::register(&mut reg);
    ipv6::register(&mut reg);
    udp::register(&mut reg);
    tcp::register(&mut reg);
    icmpv6::register(&mut reg);
    mld::register(&mut reg);
    http::register(&mut reg);
    reg
}

/// Pseudo-header sum for a transport checksum, taken from an explicitly
/// supplied enclosing network layer (never an implicit back-reference)
pub fn pseudo_sum_for(enclosing: &Header, protocol: u8, len: u32) -> Result<u32> {
    match enclosing.type_name() {
        ipv4::NAME => {
            let src = enclosing.ipv4("src").ok_or(Error::MissingValue {
                layer: ipv4::NAME,
                field: "src",
            })?;
            let dst = enclosing.ipv4("dst").ok_or(Error::MissingValue {
                layer: ipv4::NAME,
                field: "dst",
            })?;
            Ok(pseudo_sum_v4(src, dst, protocol, len))
        }
        ipv6::NAME => {
            let src = enclosing.ipv6("src").ok_or(Error::MissingValue {
                layer: ipv6::NAME,
                field: "src",
            })?;
            let dst = enclosing.ipv6("dst").ok_or(Error::MissingValue {
                layer: ipv6::NAME,
                field: "dst",
            })?;
            Ok(pseudo_sum_v6(src, dst, protocol, len))
        }
        other => Err(Error::codec(format!(
            "no pseudo-header rule for enclosing layer '{other}'"
        ))),
    }
}

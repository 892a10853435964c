//! MLDv2 report body (RFC 3810)
//!
//! Nests inside ICMPv6 when the message type is 143. The report carries a
//! counted list of multicast address records; each record carries its own
//! counted source-address list plus auxiliary data, both sized by fields
//! earlier in the record.

use crate::icmpv6;
use layerkit_engine::{ArrayCodec, CountSrc, FieldDesc, Header, HeaderType, Registry};
use std::sync::Arc;

pub const NAME: &str = "mldv2_report";
pub const RECORD_NAME: &str = "mld_record";
pub const SOURCE_NAME: &str = "mld_source";

pub const MODE_IS_INCLUDE: u64 = 1;
pub const MODE_IS_EXCLUDE: u64 = 2;
pub const CHANGE_TO_INCLUDE: u64 = 3;
pub const CHANGE_TO_EXCLUDE: u64 = 4;

pub fn source_type() -> HeaderType {
    HeaderType::new(SOURCE_NAME).field(FieldDesc::ipv6("addr"))
}

fn aux_len(rec: &Header) -> usize {
    rec.uint("auxlen").unwrap_or(0) as usize * 4
}

pub fn record_type() -> HeaderType {
    record_type_with(Arc::new(source_type()))
}

fn record_type_with(source: Arc<HeaderType>) -> HeaderType {
    HeaderType::new(RECORD_NAME)
        .field(FieldDesc::uint("rtype", 1).default(MODE_IS_EXCLUDE as u8))
        .field(FieldDesc::uint("auxlen", 1))
        .field(FieldDesc::uint("numsrc", 2))
        .field(FieldDesc::ipv6("mca"))
        .field(FieldDesc::array(
            "srcs",
            ArrayCodec::counted(source, CountSrc::Field("numsrc")),
        ))
        .field(FieldDesc::bytes("aux").size_fn(aux_len))
}

pub fn header_type() -> HeaderType {
    header_type_with(Arc::new(record_type()))
}

fn header_type_with(record: Arc<HeaderType>) -> HeaderType {
    HeaderType::new(NAME)
        .field(FieldDesc::uint("reserved", 2))
        .field(FieldDesc::uint("numaddr", 2))
        .field(FieldDesc::array(
            "records",
            ArrayCodec::counted(record, CountSrc::Field("numaddr")),
        ))
}

pub fn register(reg: &mut Registry) {
    // Element types embedded in the array codecs are registered as the
    // same shared handles
    let source = Arc::new(source_type());
    let record = Arc::new(record_type_with(Arc::clone(&source)));
    reg.register_shared(&source);
    reg.register_shared(&record);
    reg.register(header_type_with(record));
    reg.bind_value(icmpv6::NAME, "type", icmpv6::TYPE_MLDV2_REPORT, NAME);
}

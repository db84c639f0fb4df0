//! PPP protocol numbers and control-packet codes.

/// PPP protocol numbers this core carries.
///
/// Anything else on the wire is unsupported and terminates the session;
/// the dispatcher therefore works with the raw `u16` first and converts
/// through [`Protocol::from_u16`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Link Control Protocol (RFC 1661).
    Lcp,
    /// IP Control Protocol (RFC 1332).
    Ipcp,
    /// IPv6 Control Protocol (RFC 5072).
    Ip6cp,
    /// IPv4 datagrams.
    Ipv4,
    /// IPv6 datagrams.
    Ipv6,
}

impl Protocol {
    /// Wire value, big-endian on the wire.
    #[must_use]
    pub fn to_u16(self) -> u16 {
        match self {
            Self::Lcp => 0xC021,
            Self::Ipcp => 0x8021,
            Self::Ip6cp => 0x8057,
            Self::Ipv4 => 0x0021,
            Self::Ipv6 => 0x0057,
        }
    }

    /// Parse a wire value. `None` for protocols this core does not carry.
    #[must_use]
    pub fn from_u16(raw: u16) -> Option<Self> {
        match raw {
            0xC021 => Some(Self::Lcp),
            0x8021 => Some(Self::Ipcp),
            0x8057 => Some(Self::Ip6cp),
            0x0021 => Some(Self::Ipv4),
            0x0057 => Some(Self::Ipv6),
            _ => None,
        }
    }

    /// True for the negotiation protocols (LCP, IPCP, IP6CP).
    #[must_use]
    pub fn is_control(self) -> bool {
        matches!(self, Self::Lcp | Self::Ipcp | Self::Ip6cp)
    }
}

/// Control-packet codes shared by LCP, IPCP and IP6CP (RFC 1661 §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    /// Open or renegotiate the link.
    ConfigureRequest,
    /// All options in the request were acceptable.
    ConfigureAck,
    /// Some options were recognised but their values rejected.
    ConfigureNak,
    /// Some options were not recognised at all.
    ConfigureReject,
    /// Close the link.
    TerminateRequest,
    /// Acknowledge a close.
    TerminateAck,
    /// The peer received a code it does not implement.
    CodeReject,
    /// The peer received a protocol it does not implement.
    ProtocolReject,
    /// Liveness probe carrying the sender's magic number.
    EchoRequest,
    /// Response to an Echo-Request.
    EchoReply,
    /// One-way no-op used as a keepalive.
    DiscardRequest,
}

impl Code {
    /// Wire value.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::ConfigureRequest => 1,
            Self::ConfigureAck => 2,
            Self::ConfigureNak => 3,
            Self::ConfigureReject => 4,
            Self::TerminateRequest => 5,
            Self::TerminateAck => 6,
            Self::CodeReject => 7,
            Self::ProtocolReject => 8,
            Self::EchoRequest => 9,
            Self::EchoReply => 10,
            Self::DiscardRequest => 11,
        }
    }

    /// Parse a wire value. `None` for codes outside 1..=11.
    #[must_use]
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::ConfigureRequest),
            2 => Some(Self::ConfigureAck),
            3 => Some(Self::ConfigureNak),
            4 => Some(Self::ConfigureReject),
            5 => Some(Self::TerminateRequest),
            6 => Some(Self::TerminateAck),
            7 => Some(Self::CodeReject),
            8 => Some(Self::ProtocolReject),
            9 => Some(Self::EchoRequest),
            10 => Some(Self::EchoReply),
            11 => Some(Self::DiscardRequest),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_round_trip() {
        for proto in [Protocol::Lcp, Protocol::Ipcp, Protocol::Ip6cp, Protocol::Ipv4, Protocol::Ipv6]
        {
            assert_eq!(Protocol::from_u16(proto.to_u16()), Some(proto));
        }
    }

    #[test]
    fn unknown_protocol_rejected() {
        assert_eq!(Protocol::from_u16(0xC023), None); // PAP is out of scope
        assert_eq!(Protocol::from_u16(0x0000), None);
    }

    #[test]
    fn code_round_trip() {
        for raw in 1..=11u8 {
            let code = Code::from_u8(raw).unwrap();
            assert_eq!(code.to_u8(), raw);
        }
        assert_eq!(Code::from_u8(0), None);
        assert_eq!(Code::from_u8(12), None);
    }
}

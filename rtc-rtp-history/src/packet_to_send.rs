use bytes::{BufMut, Bytes, BytesMut};
use units::Timestamp;

/// Size of a fixed RTP header without CSRCs or extensions.
pub const RTP_HEADER_SIZE: usize = 12;
/// Size of the original sequence number field an RTX payload starts with.
pub const RTX_HEADER_SIZE: usize = 2;

/// What kind of data an outgoing packet carries, used by the pacer for
/// prioritization.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RtpPacketMediaType {
    Audio,
    Video,
    Retransmission,
    ForwardErrorCorrection,
    Padding,
}

/// An outgoing RTP packet together with the sender side metadata that
/// travels with it through the pacer and the packet history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacketToSend {
    pub ssrc: u32,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub payload_type: u8,
    pub marker: bool,
    pub payload: Bytes,
    /// Number of padding bytes appended after the payload.
    pub padding_size: usize,
    /// When the media in this packet was captured.
    pub capture_time: Timestamp,
    pub packet_type: Option<RtpPacketMediaType>,
    /// Whether the packet may be stored for retransmission.
    pub allow_retransmission: bool,
    /// For RTX packets, the sequence number of the packet being resent.
    pub retransmitted_sequence_number: Option<u16>,
    /// For RTX packets, the SSRC of the media stream being resent.
    pub original_ssrc: Option<u32>,
}

impl Default for RtpPacketToSend {
    fn default() -> Self {
        Self {
            ssrc: 0,
            sequence_number: 0,
            timestamp: 0,
            payload_type: 0,
            marker: false,
            payload: Bytes::new(),
            padding_size: 0,
            capture_time: Timestamp::zero(),
            packet_type: None,
            allow_retransmission: false,
            retransmitted_sequence_number: None,
            original_ssrc: None,
        }
    }
}

impl RtpPacketToSend {
    pub fn payload_size(&self) -> usize {
        self.payload.len()
    }

    /// Total size on the wire, header included.
    pub fn size(&self) -> usize {
        RTP_HEADER_SIZE + self.payload.len() + self.padding_size
    }

    /// Builds the RFC 4588 retransmission of this packet on an RTX stream.
    ///
    /// The RTX payload is the original sequence number in network byte order
    /// followed by the original payload. The result can be returned straight
    /// from an encapsulator passed to
    /// [`RtpPacketHistory::get_packet_and_mark_as_pending_with`](crate::RtpPacketHistory::get_packet_and_mark_as_pending_with).
    ///
    /// ```
    /// use rtc_rtp_history::RtpPacketToSend;
    ///
    /// let media = RtpPacketToSend {
    ///     ssrc: 1,
    ///     sequence_number: 0x1234,
    ///     payload: vec![0xaa, 0xbb].into(),
    ///     ..Default::default()
    /// };
    /// let rtx = media.to_rtx(2, 97, 7);
    /// assert_eq!(&rtx.payload[..], &[0x12, 0x34, 0xaa, 0xbb]);
    /// assert_eq!(rtx.original_ssrc, Some(1));
    /// ```
    pub fn to_rtx(&self, rtx_ssrc: u32, rtx_payload_type: u8, sequence_number: u16) -> Self {
        let mut payload = BytesMut::with_capacity(RTX_HEADER_SIZE + self.payload.len());
        payload.put_u16(self.sequence_number);
        payload.extend_from_slice(&self.payload);

        Self {
            ssrc: rtx_ssrc,
            sequence_number,
            timestamp: self.timestamp,
            payload_type: rtx_payload_type,
            marker: self.marker,
            payload: payload.freeze(),
            padding_size: self.padding_size,
            capture_time: self.capture_time,
            packet_type: Some(RtpPacketMediaType::Retransmission),
            allow_retransmission: false,
            retransmitted_sequence_number: Some(self.sequence_number),
            original_ssrc: Some(self.ssrc),
        }
    }
}

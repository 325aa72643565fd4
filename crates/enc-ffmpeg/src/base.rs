use ffmpeg::{
    Packet,
    codec::encoder,
    format::{self},
    frame,
};

pub struct EncoderBase {
    packet: ffmpeg::Packet,
    stream_index: usize,
    next_pts: i64,
}

impl EncoderBase {
    pub(crate) fn new(stream_index: usize) -> Self {
        Self {
            packet: Packet::empty(),
            stream_index,
            next_pts: 0,
        }
    }

    /// Frames are stamped by position; the encoder time base is one frame.
    pub fn update_pts(&mut self, frame: &mut frame::Frame) {
        frame.set_pts(Some(self.next_pts));
        self.next_pts += 1;
    }

    pub fn frames_sent(&self) -> u64 {
        self.next_pts as u64
    }

    pub fn send_frame(
        &mut self,
        frame: &frame::Frame,
        output: &mut format::context::Output,
        encoder: &mut encoder::encoder::Encoder,
    ) -> Result<(), ffmpeg::Error> {
        encoder.send_frame(frame)?;

        self.process_packets(output, encoder)
    }

    fn process_packets(
        &mut self,
        output: &mut format::context::Output,
        encoder: &mut encoder::encoder::Encoder,
    ) -> Result<(), ffmpeg::Error> {
        let stream_time_base = output
            .stream(self.stream_index)
            .ok_or(ffmpeg::Error::StreamNotFound)?
            .time_base();

        while encoder.receive_packet(&mut self.packet).is_ok() {
            self.packet.set_stream(self.stream_index);
            self.packet
                .rescale_ts(encoder.time_base(), stream_time_base);
            self.packet.write_interleaved(output)?;
        }

        Ok(())
    }

    pub fn process_eof(
        &mut self,
        output: &mut format::context::Output,
        encoder: &mut encoder::encoder::Encoder,
    ) -> Result<(), ffmpeg::Error> {
        encoder.send_eof()?;

        self.process_packets(output, encoder)
    }
}

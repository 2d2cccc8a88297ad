#![allow(dead_code)]

use std::io::{self, Write};

use tempfile::NamedTempFile;

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Encodes a signed integer as sign and magnitude.
pub(crate) fn grib_i16(val: i16) -> [u8; 2] {
    let magnitude = val.unsigned_abs();
    let sign = if val < 0 { 0x8000 } else { 0 };
    (magnitude | sign).to_be_bytes()
}

pub(crate) fn section(num: u8, body: &[u8]) -> Vec<u8> {
    let len = (body.len() + 5) as u32;
    let mut buf = len.to_be_bytes().to_vec();
    buf.push(num);
    buf.extend_from_slice(body);
    buf
}

pub(crate) fn indicator(total_length: u64) -> Vec<u8> {
    let mut buf = b"GRIB".to_vec();
    buf.extend_from_slice(&[0x00, 0x00, 0x00, 0x02]);
    buf.extend_from_slice(&total_length.to_be_bytes());
    buf
}

pub(crate) fn identification() -> Vec<u8> {
    section(
        1,
        &[
            0x00, 0x22, 0x00, 0x00, 0x02, 0x01, 0x00, 0x07, 0xe0, 0x08, 0x16, 0x02, 0x00, 0x00,
            0x00, 0x02,
        ],
    )
}

pub(crate) struct ReprBuilder {
    pub(crate) num_points: u32,
    pub(crate) template_num: u16,
    pub(crate) ref_val: f32,
    pub(crate) exp: i16,
    pub(crate) dec: i16,
    pub(crate) num_bits: u8,
    pub(crate) trailer: Vec<u8>,
}

impl ReprBuilder {
    pub(crate) fn simple(num_points: u32, num_bits: u8) -> Self {
        Self {
            num_points,
            template_num: 0,
            ref_val: 0.0,
            exp: 0,
            dec: 0,
            num_bits,
            trailer: Vec::new(),
        }
    }

    pub(crate) fn jpeg2000(
        num_points: u32,
        num_bits: u8,
        missing_value_management: u8,
        primary: u32,
        secondary: u32,
    ) -> Self {
        let mut trailer = vec![0x00, missing_value_management];
        trailer.extend_from_slice(&primary.to_be_bytes());
        trailer.extend_from_slice(&secondary.to_be_bytes());
        Self {
            template_num: 40,
            trailer,
            ..Self::simple(num_points, num_bits)
        }
    }

    pub(crate) fn scale(mut self, ref_val: f32, exp: i16, dec: i16) -> Self {
        self.ref_val = ref_val;
        self.exp = exp;
        self.dec = dec;
        self
    }

    pub(crate) fn template(mut self, template_num: u16) -> Self {
        self.template_num = template_num;
        self
    }

    pub(crate) fn body(&self) -> Vec<u8> {
        let mut buf = self.num_points.to_be_bytes().to_vec();
        buf.extend_from_slice(&self.template_num.to_be_bytes());
        buf.extend_from_slice(&self.ref_val.to_be_bytes());
        buf.extend_from_slice(&grib_i16(self.exp));
        buf.extend_from_slice(&grib_i16(self.dec));
        buf.push(self.num_bits);
        buf.push(0x00);
        buf.extend_from_slice(&self.trailer);
        buf
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        section(5, &self.body())
    }
}

pub(crate) fn no_bitmap() -> Vec<u8> {
    section(6, &[0xff])
}

pub(crate) fn bitmap(bits: &[u8]) -> Vec<u8> {
    let mut body = vec![0x00];
    body.extend_from_slice(bits);
    section(6, &body)
}

pub(crate) fn data(payload: &[u8]) -> Vec<u8> {
    section(7, payload)
}

/// Packs values with `nbit` bits each, most significant bit first.
pub(crate) fn pack_bits(values: &[u32], nbit: usize) -> Vec<u8> {
    let num_bits = values.len() * nbit;
    let mut buf = vec![0u8; num_bits.div_ceil(8)];
    let mut bit_pos = 0;
    for &val in values {
        for i in (0..nbit).rev() {
            if (val >> i) & 1 == 1 {
                buf[bit_pos / 8] |= 0x80 >> (bit_pos % 8);
            }
            bit_pos += 1;
        }
    }
    buf
}

pub(crate) fn write_to_tempfile(bytes: &[u8]) -> Result<NamedTempFile, io::Error> {
    let mut out = NamedTempFile::new()?;
    out.write_all(bytes)?;
    out.flush()?;
    Ok(out)
}

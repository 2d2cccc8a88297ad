use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};

use grib_repr::*;

mod utils;

use utils::{ReprBuilder, bitmap, data, no_bitmap, pack_bits};

fn decode_sections(
    registry: &TemplateRegistry,
    sections: &[u8],
    num_points: usize,
) -> Result<DecodedGrid, GribError> {
    let mut reader = Cursor::new(sections);
    let decoder = Grib2DataDecoder::from_reader(registry, &mut reader, GridShape::new(num_points))?;
    decoder.dispatch()
}

fn concat(sections: &[Vec<u8>]) -> Vec<u8> {
    sections.concat()
}

#[test]
fn simple_packing_with_values_straddling_octets() -> Result<(), Box<dyn std::error::Error>> {
    utils::init_logger();
    let values = [0, 1, 4095, 2048];
    let payload = pack_bits(&values, 12);
    assert_eq!(payload.len(), 6);

    let sections = concat(&[
        ReprBuilder::simple(4, 12).build(),
        no_bitmap(),
        data(&payload),
    ]);
    let registry = TemplateRegistry::with_default_templates();
    let grid = decode_sections(&registry, &sections, 4)?;

    assert_eq!(grid.values(), &[0.0, 1.0, 4095.0, 2048.0]);
    Ok(())
}

#[test]
fn simple_packing_with_scale_factors() -> Result<(), Box<dyn std::error::Error>> {
    let registry = TemplateRegistry::with_default_templates();

    let sections = concat(&[
        ReprBuilder::simple(4, 4).scale(1.0, 1, 1).build(),
        no_bitmap(),
        data(&pack_bits(&[0, 1, 2, 3], 4)),
    ]);
    let grid = decode_sections(&registry, &sections, 4)?;
    assert_eq!(grid.values(), &[0.1, 0.3, 0.5, 0.7]);

    let sections = concat(&[
        ReprBuilder::simple(3, 2).scale(1.5, -1, -2).build(),
        no_bitmap(),
        data(&pack_bits(&[0, 1, 2], 2)),
    ]);
    let grid = decode_sections(&registry, &sections, 3)?;
    assert_eq!(grid.values(), &[150.0, 200.0, 250.0]);
    Ok(())
}

#[test]
fn simple_packing_with_zero_bits() -> Result<(), Box<dyn std::error::Error>> {
    let sections = concat(&[
        ReprBuilder::simple(5, 0).scale(2.5, 0, 1).build(),
        no_bitmap(),
        data(&[]),
    ]);
    let registry = TemplateRegistry::with_default_templates();
    let grid = decode_sections(&registry, &sections, 5)?;

    assert_eq!(grid.values(), &[0.25; 5]);
    Ok(())
}

#[test]
fn simple_packing_with_payload_one_octet_short() {
    let payload = pack_bits(&[1, 2, 3, 4, 5], 7);
    let sections = concat(&[
        ReprBuilder::simple(5, 7).build(),
        no_bitmap(),
        data(&payload[..payload.len() - 1]),
    ]);
    let registry = TemplateRegistry::with_default_templates();
    let actual = decode_sections(&registry, &sections, 5);

    assert_eq!(actual, Err(GribError::TruncatedInput));
}

#[test]
fn simple_packing_with_extra_payload() {
    let mut payload = pack_bits(&[1, 2, 3, 4, 5], 7);
    payload.push(0x00);
    let sections = concat(&[
        ReprBuilder::simple(5, 7).build(),
        no_bitmap(),
        data(&payload),
    ]);
    let registry = TemplateRegistry::with_default_templates();
    let actual = decode_sections(&registry, &sections, 5);

    assert_eq!(
        actual,
        Err(GribError::SectionLengthMismatch {
            expected: 5,
            actual: 6
        })
    );
}

#[test]
fn repr_section_shorter_than_fixed_fields() {
    let mut sect5 = ReprBuilder::simple(4, 8).build();
    sect5[3] = 0x14;
    let sections = concat(&[sect5, no_bitmap(), data(&[1, 2, 3, 4])]);
    let registry = TemplateRegistry::with_default_templates();
    let mut reader = Cursor::new(&sections[..]);
    let actual = Grib2DataDecoder::from_reader(&registry, &mut reader, GridShape::new(4));

    assert!(matches!(
        actual,
        Err(GribError::SectionLengthMismatch {
            expected: 21,
            actual: 20
        })
    ));
    assert_eq!(reader.position(), 5);
}

#[test]
fn repr_section_with_unknown_trailing_octets() {
    let mut builder = ReprBuilder::simple(4, 8);
    builder.trailer = vec![0x00, 0x00];
    let sections = concat(&[builder.build(), no_bitmap(), data(&[1, 2, 3, 4])]);
    let registry = TemplateRegistry::with_default_templates();
    let actual = decode_sections(&registry, &sections, 4);

    assert_eq!(
        actual,
        Err(GribError::SectionLengthMismatch {
            expected: 21,
            actual: 23
        })
    );
}

#[test]
fn unsupported_template_stops_after_repr_section() {
    let mut builder = ReprBuilder::simple(4, 8).template(9999);
    builder.trailer = vec![0x01, 0x02, 0x03];
    let sect5 = builder.build();
    let sect5_len = sect5.len() as u64;
    let sections = concat(&[sect5, no_bitmap(), data(&[1, 2, 3, 4])]);

    let registry = TemplateRegistry::with_default_templates();
    let mut reader = Cursor::new(&sections[..]);
    let actual = Grib2DataDecoder::from_reader(&registry, &mut reader, GridShape::new(4));

    assert!(matches!(actual, Err(GribError::UnsupportedTemplate(9999))));
    assert_eq!(reader.position(), sect5_len);
}

#[test]
fn values_are_spread_over_grid_with_bitmap() -> Result<(), Box<dyn std::error::Error>> {
    let sections = concat(&[
        ReprBuilder::simple(4, 8).scale(10.0, 0, 0).build(),
        bitmap(&[0b1011_0100]),
        data(&[1, 2, 3, 4]),
    ]);
    let registry = TemplateRegistry::with_default_templates();
    let grid = decode_sections(&registry, &sections, 6)?;

    assert_eq!(grid.len(), 6);
    assert_eq!(grid.num_missing(), 2);
    let expected = [Some(11.0), None, Some(12.0), Some(13.0), None, Some(14.0)];
    for (actual, expected) in grid.iter().zip(expected) {
        match expected {
            Some(val) => assert_eq!(*actual, val),
            None => assert!(actual.is_nan()),
        }
    }
    Ok(())
}

#[test]
fn bitmap_disagreeing_with_number_of_values() {
    let sections = concat(&[
        ReprBuilder::simple(4, 8).build(),
        bitmap(&[0b1010_0000]),
        data(&[1, 2, 3, 4]),
    ]);
    let registry = TemplateRegistry::with_default_templates();
    let actual = decode_sections(&registry, &sections, 6);

    assert!(matches!(
        actual,
        Err(GribError::SectionLengthMismatch { .. })
    ));
}

#[test]
fn grid_size_disagreeing_with_number_of_values() {
    let sections = concat(&[
        ReprBuilder::simple(4, 8).build(),
        no_bitmap(),
        data(&[1, 2, 3, 4]),
    ]);
    let registry = TemplateRegistry::with_default_templates();
    let actual = decode_sections(&registry, &sections, 6);

    assert!(actual.is_err());
}

fn stub_registry(image: DecodedImage) -> TemplateRegistry {
    let mut registry = TemplateRegistry::with_default_templates();
    let codec = move |codestream: &[u8]| -> Result<DecodedImage, GribError> {
        if codestream.starts_with(&[0xff, 0x4f]) {
            Ok(image.clone())
        } else {
            Err(GribError::CodecDecodeError("not a code stream".to_owned()))
        }
    };
    registry.register(Jpeg2000CodeStream::with_codec(codec));
    registry
}

fn gray_image() -> DecodedImage {
    DecodedImage::new(3, 2, vec![vec![0, 7, 3, 9, 7, 1]]).unwrap()
}

macro_rules! test_missing_value_management {
    ($(($name:ident, $management:expr, $expected:expr),)*) => ($(
        #[test]
        fn $name() -> Result<(), Box<dyn std::error::Error>> {
            let sections = concat(&[
                ReprBuilder::jpeg2000(6, 4, $management, 7, 9).scale(1.0, 1, 0).build(),
                no_bitmap(),
                data(&[0xff, 0x4f, 0xff, 0x51]),
            ]);
            let registry = stub_registry(gray_image());
            let grid = decode_sections(&registry, &sections, 6)?;

            let actual = grid
                .iter()
                .map(|v| if v.is_nan() { None } else { Some(*v) })
                .collect::<Vec<_>>();
            assert_eq!(actual, $expected);
            Ok(())
        }
    )*);
}

test_missing_value_management! {
    (
        jpeg2000_without_missing_values,
        0,
        vec![Some(1.0), Some(15.0), Some(7.0), Some(19.0), Some(15.0), Some(3.0)]
    ),
    (
        jpeg2000_with_primary_missing_values,
        1,
        vec![Some(1.0), None, Some(7.0), Some(19.0), None, Some(3.0)]
    ),
    (
        jpeg2000_with_primary_and_secondary_missing_values,
        2,
        vec![Some(1.0), None, Some(7.0), None, None, Some(3.0)]
    ),
}

#[test]
fn jpeg2000_with_multi_component_image() {
    let image = DecodedImage::new(1, 2, vec![vec![1, 2], vec![3, 4], vec![5, 6]]).unwrap();
    let sections = concat(&[
        ReprBuilder::jpeg2000(2, 4, 0, 0, 0).build(),
        no_bitmap(),
        data(&[0xff, 0x4f]),
    ]);
    let registry = stub_registry(image);
    let actual = decode_sections(&registry, &sections, 2);

    assert_eq!(
        actual,
        Err(GribError::UnsupportedEncoding("number of image components", 3))
    );
}

#[test]
fn jpeg2000_header_survives_codec_failure() -> Result<(), Box<dyn std::error::Error>> {
    let registry = stub_registry(gray_image());

    for payload in [&[][..], &[0x00, 0x01, 0x02][..]] {
        let sections = concat(&[
            ReprBuilder::jpeg2000(6, 4, 1, 7, 0).scale(1.0, 1, 0).build(),
            no_bitmap(),
            data(payload),
        ]);
        let mut reader = Cursor::new(&sections[..]);
        let decoder = Grib2DataDecoder::from_reader(&registry, &mut reader, GridShape::new(6))?;

        assert!(matches!(
            decoder.dispatch(),
            Err(GribError::CodecDecodeError(_))
        ));
        let repr = decoder.repr();
        assert_eq!(repr.template_num, 40);
        assert_eq!(repr.num_encoded_points(), 6);
        assert_eq!(repr.simple.exp, 1);
        assert!(matches!(
            &repr.template,
            TemplateParam::ImageCompression(ImageCompressionParam {
                missing_value_management: MissingValueManagement::Primary,
                primary_missing_value: 7,
                ..
            })
        ));
    }
    Ok(())
}

struct Doubling;

impl DataTemplate for Doubling {
    fn template_num(&self) -> u16 {
        9999
    }

    fn read_param(&self, slice: &[u8], pos: &mut usize) -> Result<TemplateParam, GribError> {
        u8::try_from_slice(slice, pos)?;
        Ok(TemplateParam::Simple)
    }

    fn decode(&self, repr: &ReprDefinition, payload: &[u8]) -> Result<Vec<f64>, GribError> {
        let values = unpack_simple(payload, &repr.simple, repr.num_encoded_points())?;
        Ok(values.into_iter().map(|v| v * 2.0).collect())
    }
}

#[test]
fn decoding_with_user_defined_template() -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = ReprBuilder::simple(3, 8).template(9999);
    builder.trailer = vec![0x00];
    let sections = concat(&[builder.build(), no_bitmap(), data(&[1, 2, 3])]);

    let mut registry = TemplateRegistry::with_default_templates();
    assert!(registry.register(Doubling).is_none());
    let grid = decode_sections(&registry, &sections, 3)?;

    assert_eq!(grid.values(), &[2.0, 4.0, 6.0]);
    Ok(())
}

#[test]
fn decoding_from_section_envelopes() -> Result<(), Box<dyn std::error::Error>> {
    let sect5 = SectionEnvelope::from_body(5, ReprBuilder::simple(2, 16).body().into());
    let sect6 = SectionEnvelope::from_body(6, vec![0xff].into_boxed_slice());
    let sect7 = SectionEnvelope::from_body(7, vec![0x00, 0x01, 0x01, 0x00].into_boxed_slice());

    let registry = TemplateRegistry::with_default_templates();
    let grid_shape = GridShape::from_dims(2, 1);
    let decoder = Grib2DataDecoder::new(&registry, &sect5, &sect6, sect7, grid_shape)?;
    let values: Vec<f64> = decoder.dispatch()?.into();

    assert_eq!(values, vec![1.0, 256.0]);
    Ok(())
}

#[test]
fn decoding_from_envelopes_in_wrong_order() {
    let sect5 = SectionEnvelope::from_body(5, ReprBuilder::simple(1, 8).body().into());
    let sect6 = SectionEnvelope::from_body(6, vec![0xff].into_boxed_slice());
    let sect7 = SectionEnvelope::from_body(7, vec![0x2a].into_boxed_slice());
    let registry = TemplateRegistry::with_default_templates();
    let grid_shape = GridShape::new(1);

    let mislabeled = SectionEnvelope::from_body(7, sect5.body().into());
    let actual = Grib2DataDecoder::new(&registry, &mislabeled, &sect6, sect6.clone(), grid_shape);
    assert!(matches!(actual, Err(GribError::MalformedHeader(_))));

    let actual = Grib2DataDecoder::new(&registry, &sect5, &sect6, sect6.clone(), grid_shape);
    assert!(matches!(actual, Err(GribError::MalformedHeader(_))));

    let decoder = Grib2DataDecoder::new(&registry, &sect5, &sect6, sect7, grid_shape);
    assert_eq!(decoder.and_then(|d| d.dispatch()).map(Vec::from), Ok(vec![42.0]));
}

#[test]
fn decoding_from_envelope_with_short_repr_section() {
    let sect5 = SectionEnvelope::from_body(5, vec![0x00, 0x00, 0x00, 0x01].into_boxed_slice());
    let sect6 = SectionEnvelope::from_body(6, vec![0xff].into_boxed_slice());
    let sect7 = SectionEnvelope::from_body(7, vec![0x2a].into_boxed_slice());
    let registry = TemplateRegistry::with_default_templates();
    let actual = Grib2DataDecoder::new(&registry, &sect5, &sect6, sect7, GridShape::new(1));

    assert!(matches!(
        actual,
        Err(GribError::SectionLengthMismatch {
            expected: 21,
            actual: 9
        })
    ));
}

#[test]
fn jpeg2000_code_stream_inside_repr_section() -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = ReprBuilder::jpeg2000(6, 4, 1, 7, 0).scale(1.0, 1, 0);
    builder.trailer.extend_from_slice(&[0xff, 0x4f, 0xff, 0x51]);
    let sect5 = builder.build();
    let sections = concat(&[sect5.clone(), no_bitmap(), data(&[])]);
    let registry = stub_registry(gray_image());

    let mut reader = Cursor::new(&sections[..]);
    let decoder = Grib2DataDecoder::from_reader(&registry, &mut reader, GridShape::new(6))?;
    assert_eq!(decoder.repr().trailer.as_ref(), &[0xff, 0x4f, 0xff, 0x51]);
    let grid = decoder.dispatch()?;
    assert_eq!(grid.num_missing(), 2);
    assert_eq!(grid[0], 1.0);
    assert_eq!(grid[5], 3.0);

    let sections = concat(&[sect5, no_bitmap(), data(&[0xff, 0x4f])]);
    let actual = decode_sections(&registry, &sections, 6);
    assert_eq!(
        actual,
        Err(GribError::SectionLengthMismatch {
            expected: 0,
            actual: 2
        })
    );
    Ok(())
}

#[test]
fn decoding_messages_on_multiple_threads() -> Result<(), Box<dyn std::error::Error>> {
    let registry = stub_registry(gray_image());
    let messages = (0..8u8)
        .map(|i| {
            if i % 2 == 0 {
                concat(&[
                    ReprBuilder::simple(6, 8).scale(f32::from(i), 0, 0).build(),
                    no_bitmap(),
                    data(&[0, 1, 2, 3, 4, 5]),
                ])
            } else {
                concat(&[
                    ReprBuilder::jpeg2000(6, 4, 1, 7, 0).scale(f32::from(i), 0, 0).build(),
                    no_bitmap(),
                    data(&[0xff, 0x4f]),
                ])
            }
        })
        .collect::<Vec<_>>();

    let registry = &registry;
    let results = std::thread::scope(|s| {
        let handles = messages
            .iter()
            .map(|msg| s.spawn(move || decode_sections(registry, msg, 6)))
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });

    for (i, result) in results.into_iter().enumerate() {
        let grid = result?;
        let r = i as f64;
        if i % 2 == 0 {
            assert_eq!(grid.values(), &[r, r + 1.0, r + 2.0, r + 3.0, r + 4.0, r + 5.0]);
        } else {
            assert_eq!(grid.num_missing(), 2);
            assert_eq!(grid[0], r);
            assert_eq!(grid[3], r + 9.0);
        }
    }
    Ok(())
}

#[test]
fn reading_whole_message_from_file() -> Result<(), Box<dyn std::error::Error>> {
    utils::init_logger();
    let body = concat(&[
        utils::identification(),
        utils::section(3, &[0x00; 9]),
        utils::section(4, &[0x00; 29]),
        ReprBuilder::simple(4, 8).scale(0.5, 0, 0).build(),
        no_bitmap(),
        data(&[0, 1, 2, 3]),
        b"7777".to_vec(),
    ]);
    let total_length = (16 + body.len()) as u64;
    let message = concat(&[utils::indicator(total_length), body]);
    let file = utils::write_to_tempfile(&message)?;

    let mut f = file.reopen()?;
    f.seek(SeekFrom::Start(0))?;
    let mut f = BufReader::new(f);

    let indicator = Indicator::from_reader(&mut f)?;
    assert_eq!(indicator.total_length, message.len() as u64);
    let identification = Identification::from_reader(&mut f)?;
    assert_eq!(identification.centre_id, 34);
    for expected in [3, 4] {
        let sect = SectionEnvelope::read(&mut f)?;
        assert_eq!(sect.num(), expected);
    }

    let registry = TemplateRegistry::with_default_templates();
    let decoder = Grib2DataDecoder::from_reader(&registry, &mut f, GridShape::new(4))?;
    assert_eq!(decoder.dispatch()?.values(), &[0.5, 1.5, 2.5, 3.5]);

    let mut end = Vec::new();
    f.read_to_end(&mut end)?;
    assert_eq!(end, b"7777");
    Ok(())
}

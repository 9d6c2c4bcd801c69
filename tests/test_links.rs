// tests/test_links.rs: CRSF telemetry ingestion and serial camera framing.

use flight_vision::drivers::camera_link::{
    encode_geometry_request, FrameAssembler, KIND_FRAME, KIND_GEOMETRY, SYNC,
};
use flight_vision::drivers::crsf::{
    build_frame, crc8_dvb_s2, CrsfParser, CrsfTelemetry, CRSF_FRAMETYPE_ATTITUDE,
    CRSF_FRAMETYPE_GPS, CRSF_FRAMETYPE_VARIO,
};
use flight_vision::link::TelemetryLink;
use flight_vision::state::TelemetryBus;

fn approx(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() <= tol
}

fn crsf(frame_type: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = [0u8; 64];
    let n = build_frame(&mut buf, frame_type, payload);
    assert!(n > 0);
    buf[..n].to_vec()
}

fn feed(parser: &mut CrsfParser, bytes: &[u8]) -> Vec<CrsfTelemetry> {
    bytes.iter().filter_map(|&b| parser.push_byte(b)).collect()
}

fn attitude_payload(pitch: i16, roll: i16, yaw: i16) -> Vec<u8> {
    [pitch, roll, yaw].iter().flat_map(|v| v.to_be_bytes()).collect()
}

fn gps_payload(lat_e7: i32, lon_e7: i32, speed_kmh10: u16, course_cdeg: u16, alt_m: u16, sats: u8) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&lat_e7.to_be_bytes());
    p.extend_from_slice(&lon_e7.to_be_bytes());
    p.extend_from_slice(&speed_kmh10.to_be_bytes());
    p.extend_from_slice(&course_cdeg.to_be_bytes());
    p.extend_from_slice(&(alt_m + 1000).to_be_bytes());
    p.push(sats);
    p
}

// ── CRSF ──────────────────────────────────────────────────────────────────────

#[test]
fn attitude_frame_decodes_to_degrees() {
    let mut parser = CrsfParser::new();
    // 0.1 rad pitch, -0.2 rad roll
    let bytes = crsf(CRSF_FRAMETYPE_ATTITUDE, &attitude_payload(1000, -2000, 0));
    let out = feed(&mut parser, &bytes);
    assert_eq!(out.len(), 1);
    let CrsfTelemetry::Attitude(a) = out[0] else { panic!("expected attitude, got {:?}", out[0]) };
    assert!(approx(a.pitch, 5.7296, 1e-3), "pitch {}", a.pitch);
    assert!(approx(a.roll, -11.4592, 1e-3), "roll {}", a.roll);
    assert_eq!(a.yaw, 0.0);
}

#[test]
fn parser_resyncs_after_noise_and_bad_crc() {
    let mut parser = CrsfParser::new();
    let good = crsf(CRSF_FRAMETYPE_ATTITUDE, &attitude_payload(0, 0, 100));
    let mut corrupt = good.clone();
    let last = corrupt.len() - 1;
    corrupt[last] ^= 0xFF;

    let mut stream = vec![0x00, 0x55, 0xC8, 0xFF];
    stream.extend_from_slice(&corrupt);
    stream.extend_from_slice(&good);
    let out = feed(&mut parser, &stream);
    assert_eq!(out.len(), 1);
    assert!(matches!(out[0], CrsfTelemetry::Attitude(_)));
}

#[test]
fn unknown_frame_types_are_skipped() {
    let mut parser = CrsfParser::new();
    let mut stream = crsf(0x08, &[0, 0, 0, 0, 0, 0, 0, 0]);
    stream.extend(crsf(CRSF_FRAMETYPE_VARIO, &[0x27, 0x10, 0x00, 0x96]));
    let out = feed(&mut parser, &stream);
    assert_eq!(out.len(), 1);
    let CrsfTelemetry::Vario(v) = out[0] else { panic!("expected vario") };
    assert_eq!(v.alt_m, 0.0);
    assert_eq!(v.climb_ms, 1.5);
}

#[test]
fn dvb_s2_check_value() {
    assert_eq!(crc8_dvb_s2(b"123456789"), 0xBC);
}

// ── Telemetry link ────────────────────────────────────────────────────────────

#[test]
fn link_publishes_attitude_on_the_bus() {
    let bus = TelemetryBus::new();
    let mut link = TelemetryLink::new();
    let mut parser = CrsfParser::new();
    for msg in feed(&mut parser, &crsf(CRSF_FRAMETYPE_ATTITUDE, &attitude_payload(2182, 0, 0))) {
        link.apply(msg, &bus);
    }
    assert!(approx(bus.attitude().pitch, 12.5, 0.01));
}

#[test]
fn gps_position_is_relative_to_first_fix() {
    let bus = TelemetryBus::new();
    let mut link = TelemetryLink::new();
    let mut parser = CrsfParser::new();

    let lat = 473_977_000; // 47.3977°
    let lon = 85_456_000;

    // Too few satellites: ignored, no home yet.
    for msg in feed(&mut parser, &crsf(CRSF_FRAMETYPE_GPS, &gps_payload(lat, lon, 0, 0, 500, 3))) {
        link.apply(msg, &bus);
    }
    assert!(!link.has_home());

    for msg in feed(&mut parser, &crsf(CRSF_FRAMETYPE_GPS, &gps_payload(lat, lon, 0, 0, 500, 9))) {
        link.apply(msg, &bus);
    }
    assert!(link.has_home());
    assert_eq!(bus.position().north, 0.0);
    assert_eq!(bus.position().east, 0.0);

    // 0.001° north, 20 m up, 36 km/h due east.
    let fix = gps_payload(lat + 10_000, lon, 360, 9_000, 520, 9);
    for msg in feed(&mut parser, &crsf(CRSF_FRAMETYPE_GPS, &fix)) {
        link.apply(msg, &bus);
    }
    let p = bus.position();
    assert!(approx(p.north, 111.32, 0.05), "north {}", p.north);
    assert!(approx(p.east, 0.0, 1e-3));
    assert!(approx(p.down, -20.0, 1e-3));

    let v = bus.velocity();
    assert!(approx(v.east, 10.0, 0.05), "east {}", v.east);
    assert!(approx(v.north, 0.0, 0.05), "north {}", v.north);
}

#[test]
fn vario_sets_vertical_velocity_only() {
    let bus = TelemetryBus::new();
    let mut link = TelemetryLink::new();
    let mut parser = CrsfParser::new();
    // climb -2.5 m/s
    let climb = (-250i16).to_be_bytes();
    let payload = [0x27, 0x10, climb[0], climb[1]];
    for msg in feed(&mut parser, &crsf(CRSF_FRAMETYPE_VARIO, &payload)) {
        link.apply(msg, &bus);
    }
    let v = bus.velocity();
    assert_eq!((v.north, v.east), (0.0, 0.0));
    assert_eq!(v.down, 2.5);
}

// ── Camera link ───────────────────────────────────────────────────────────────

fn camera_frame(width: u16, height: u16, pixel: impl Fn(usize) -> u8) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&width.to_le_bytes());
    body.extend_from_slice(&height.to_le_bytes());
    body.extend((0..width as usize * height as usize).map(pixel));
    let crc = crc8_dvb_s2(&body);

    let mut out = vec![SYNC, KIND_FRAME];
    out.extend(body);
    out.push(crc);
    out
}

#[test]
fn assembles_frame_across_chunks() {
    let mut asm = FrameAssembler::<64>::new();
    let bytes = camera_frame(8, 6, |i| i as u8);

    let mut completed = 0;
    for chunk in bytes.chunks(7) {
        if asm.push(chunk) {
            completed += 1;
        }
    }
    assert_eq!(completed, 1);
    let frame = asm.frame().unwrap();
    assert_eq!((frame.width(), frame.height()), (8, 6));
    assert_eq!(frame.get(3, 2), Some(19));
    assert_eq!(frame.pixels().len(), 48);
}

#[test]
fn corrupt_frame_is_not_handed_out() {
    let mut asm = FrameAssembler::<64>::new();
    let mut bytes = camera_frame(4, 4, |_| 9);
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    assert!(!asm.push(&bytes));
    assert!(asm.frame().is_none());

    // Leading noise, then a good frame.
    let mut stream = vec![0x00, SYNC, 0x11];
    stream.extend(camera_frame(4, 4, |_| 9));
    assert!(asm.push(&stream));
    assert_eq!(asm.frame().unwrap().mean_luma(), 9);
}

#[test]
fn oversized_geometry_is_rejected() {
    let mut asm = FrameAssembler::<16>::new();
    assert!(!asm.push(&camera_frame(8, 8, |_| 0)));
    assert!(!asm.is_ready());
    assert!(asm.push(&camera_frame(4, 4, |_| 1)));
}

#[test]
fn next_header_invalidates_ready_frame() {
    let mut asm = FrameAssembler::<16>::new();
    assert!(asm.push(&camera_frame(4, 4, |_| 1)));
    assert!(asm.is_ready());
    assert!(!asm.push(&[SYNC, KIND_FRAME, 4, 0]));
    assert!(asm.frame().is_none());
}

#[test]
fn invalidated_frame_is_not_handed_out_again() {
    let mut asm = FrameAssembler::<16>::new();
    assert!(asm.push(&camera_frame(4, 4, |_| 7)));
    asm.invalidate();
    assert!(!asm.is_ready());
    assert!(asm.frame().is_none());

    // A frame split across the invalidation still completes.
    let bytes = camera_frame(4, 4, |_| 8);
    let (head, tail) = bytes.split_at(5);
    assert!(!asm.push(head));
    asm.invalidate();
    assert!(asm.push(tail));
    assert_eq!(asm.frame().unwrap().mean_luma(), 8);
}

#[test]
fn geometry_request_layout() {
    let req = encode_geometry_request(160, 120);
    assert_eq!(&req[..6], &[SYNC, KIND_GEOMETRY, 160, 0, 120, 0]);
    assert_eq!(req[6], crc8_dvb_s2(&req[2..6]));
}

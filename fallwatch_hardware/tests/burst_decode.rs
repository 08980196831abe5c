use fallwatch_hardware::util::decode_burst;

#[test]
fn burst_decodes_big_endian_words_with_scales() {
    // ax=+4096 (1 g), ay=-4096, az=0, gx=+655 (10 dps), gy=-131 (-2 dps), gz=0
    let raw = [
        0x10, 0x00, 0xF0, 0x00, 0x00, 0x00, 0x02, 0x8F, 0xFF, 0x7D, 0x00, 0x00,
    ];
    let (a, g) = decode_burst(&raw, 4096.0, 65.5);
    assert_eq!(a, [1.0, -1.0, 0.0]);
    assert!((g[0] - 10.0).abs() < 1e-4);
    assert!((g[1] + 2.0).abs() < 1e-4);
    assert_eq!(g[2], 0.0);
}

#[test]
fn full_scale_on_a_2g_part_clips_at_two_g() {
    // i16::MAX / 16384 LSB/g: a ±2 g part saturates just under 2 g per axis
    let raw = [0x7F, 0xFF, 0x7F, 0xFF, 0x7F, 0xFF, 0, 0, 0, 0, 0, 0];
    let (a, _) = decode_burst(&raw, 16384.0, 65.5);
    assert!(a.iter().all(|v| (*v - 2.0).abs() < 1e-3));
    let magnitude = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    assert!(magnitude > 3.4 && magnitude < 3.5);
}

/// Decode a 12-byte accel+gyro burst: six big-endian `i16`, accel first.
///
/// Returns acceleration in g and angular rate in deg/s.
pub fn decode_burst(
    raw: &[u8; 12],
    accel_lsb_per_g: f32,
    gyro_lsb_per_dps: f32,
) -> ([f32; 3], [f32; 3]) {
    let word = |i: usize| f32::from(i16::from_be_bytes([raw[2 * i], raw[2 * i + 1]]));
    (
        [
            word(0) / accel_lsb_per_g,
            word(1) / accel_lsb_per_g,
            word(2) / accel_lsb_per_g,
        ],
        [
            word(3) / gyro_lsb_per_dps,
            word(4) / gyro_lsb_per_dps,
            word(5) / gyro_lsb_per_dps,
        ],
    )
}

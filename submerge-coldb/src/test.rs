// End-to-end scenarios and cross-module properties. Per-module unit tests
// live alongside their module; this file only exercises behavior that spans
// more than one of them.

use half::f16;
use tempfile::tempdir;
use test_log::test;

use crate::array::{self, Array, CompressionMode};
use crate::column::Column;
use crate::container::Container;
use crate::kind::Kind;
use crate::lock;
use crate::options::ColumnOptions;
use crate::width::required_bytes_unsigned;

#[test]
fn s1_element_delta_on_u32() {
    let arr = Array::U32(vec![1, 2, 3, 4]);
    let c = array::compress(&arr, CompressionMode::ElementDelta).unwrap();
    // Every diff is non-negative, so the residual is unsigned, not signed.
    assert_eq!(c.residual, Array::U8(vec![1, 1, 1]));
    assert_eq!(c.reference, Some(Array::U32(vec![1])));
    let back = array::decompress(c.mode, c.reference.as_ref(), &c.residual, Kind::Unsigned, 32).unwrap();
    assert_eq!(back, arr);
}

#[test]
fn s2_element_delta_on_i16() {
    let arr = Array::I16(vec![-4, -2, 0, 2000]);
    let c = array::compress(&arr, CompressionMode::ElementDelta).unwrap();
    // Every diff is non-negative, so the residual is unsigned, not signed.
    assert_eq!(c.residual, Array::U16(vec![2, 2, 2000]));
    assert_eq!(c.reference, Some(Array::I16(vec![-4])));
    let back = array::decompress(c.mode, c.reference.as_ref(), &c.residual, Kind::Signed, 16).unwrap();
    assert_eq!(back, arr);
}

#[test]
fn s3_min_offset_on_f64() {
    let arr = Array::F64(vec![5.2, 0.8, 3.1415, 8.0]);
    let c = array::compress(&arr, CompressionMode::MinOffset).unwrap();
    assert_eq!(c.mode, CompressionMode::MinOffset);
    assert_eq!(c.reference, Some(Array::F64(vec![0.8])));
    match &c.residual {
        Array::F64(v) => assert_eq!(v[1], 0.0),
        other => panic!("expected the min-offset residual to stay F64, got {:?}", other),
    }
}

#[test]
fn s4_element_delta_of_doubling_series_narrows_to_float16() {
    let vals: Vec<f64> = (1..=16).map(|p| 2f64.powi(p)).collect();
    let arr = Array::F64(vals.clone());
    let c = array::compress(&arr, CompressionMode::ElementDelta).unwrap();
    assert!(matches!(c.residual, Array::F16(_)));
    assert_eq!(c.residual.bits(), 16);
    let back = array::decompress(c.mode, c.reference.as_ref(), &c.residual, Kind::Float, 64).unwrap();
    assert_eq!(back, arr);
}

#[test]
fn s6_container_with_two_uint32_columns_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s6.col");

    let mut c = Container::new();
    c.set_column(Column::new("a", false, Array::U32(vec![1, 2, 3, 4])));
    c.set_column(Column::new("b", false, Array::U32(vec![10, 20, 30, 40])));
    c.write(&path).unwrap();

    let back = Container::read(&path).unwrap();
    assert_eq!(back.get_column("a").unwrap().data, Array::U32(vec![1, 2, 3, 4]));
    assert_eq!(back.get_column("b").unwrap().data, Array::U32(vec![10, 20, 30, 40]));
    assert_eq!(back.get_column("a").unwrap().identifier, "a");
    assert_eq!(back.get_column("b").unwrap().identifier, "b");
}

#[test]
fn compression_is_identity_below_the_delta_floor_regardless_of_kind() {
    for arr in [
        Array::U8(vec![42]),
        Array::I8(vec![-7]),
        Array::F16(vec![f16::from_f32(1.5)]),
    ] {
        let c = array::compress(&arr, CompressionMode::ElementDelta).unwrap();
        assert_eq!(c.residual, arr);
        assert!(c.reference.is_none());
    }
}

#[test]
fn width_selection_boundaries() {
    for b in [1u32, 2, 4, 8] {
        let max_value = (1u128 << (8 * b)) - 1;
        assert_eq!(required_bytes_unsigned(max_value as i128).unwrap(), b as u8);
    }
    for b in [1u32, 2, 4] {
        let next_power = 1u128 << (8 * b);
        assert_eq!(required_bytes_unsigned(next_power as i128).unwrap(), (2 * b) as u8);
    }
}

#[test]
fn options_bijection_over_every_flag_combination() {
    for bits in 0..16u16 {
        let opts = ColumnOptions::decode(bits);
        assert_eq!(ColumnOptions::decode(opts.encode()), opts);
    }
}

#[test]
fn a_second_exclusive_attempt_is_refused_while_the_first_guard_is_alive() {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    let dir = tempdir().unwrap();
    let path = dir.path().join("locked.col");
    let _holder = lock::acquire_write(&path).unwrap();

    // The lock lives on the data file itself, not the sentinel.
    let second = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    assert!(flock(second.as_raw_fd(), FlockArg::LockExclusiveNonblock).is_err());
}

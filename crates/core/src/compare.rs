// RegCheck - Register Capture & Comparison Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Bit-exact comparison of expected values against captured state.
//!
//! Every `equal_*` predicate returns `true` on a match and otherwise prints a
//! single diagnostic line and returns `false`. Failing the surrounding test is
//! left to the caller. The `check_*` forms return the diagnostic instead of
//! printing it.
//!
//! Floating values are compared as raw encodings with integer comparison, so
//! NaN payloads and the sign of zero are significant.

use crate::dump::RegisterDump;
use crate::flags::Nzcv;
use crate::registers::{
    PRegister, Register, VRegister, ZRegister, NUMBER_OF_REGISTERS, NUMBER_OF_V_REGISTERS,
};
use crate::value::{Float16, QRegisterValue};

/// Signalling NaN both as a double and, in its low word, as a float.
pub const FP64_SIGNALLING_NAN: u64 = 0x7ff0_0000_7f80_0001;
pub const FP32_SIGNALLING_NAN: u32 = 0x7f80_0001;
pub const FP16_SIGNALLING_NAN: Float16 = Float16::from_bits(0x7c01);

pub const FP64_QUIET_NAN: u64 = 0x7ff8_0000_7fc0_0001;
pub const FP32_QUIET_NAN: u32 = 0x7fc0_0001;
pub const FP16_QUIET_NAN: Float16 = Float16::from_bits(0x7e01);

/// A failed comparison. Displays as the diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct Mismatch(String);

impl Mismatch {
    pub fn message(&self) -> &str {
        &self.0
    }
}

pub type CheckResult = Result<(), Mismatch>;

fn report(check: CheckResult) -> bool {
    match check {
        Ok(()) => true,
        Err(mismatch) => {
            println!("{}", mismatch);
            false
        }
    }
}

fn fp32_is_nan(bits: u32) -> bool {
    (bits & 0x7f80_0000) == 0x7f80_0000 && (bits & 0x007f_ffff) != 0
}

fn fp32_is_zero(bits: u32) -> bool {
    (bits & 0x7fff_ffff) == 0
}

fn fp64_is_nan(bits: u64) -> bool {
    (bits & 0x7ff0_0000_0000_0000) == 0x7ff0_0000_0000_0000 && (bits & 0x000f_ffff_ffff_ffff) != 0
}

fn fp64_is_zero(bits: u64) -> bool {
    (bits & 0x7fff_ffff_ffff_ffff) == 0
}

pub fn check_32(expected: u32, result: u32) -> CheckResult {
    if expected != result {
        return Err(Mismatch(format!(
            "Expected 0x{:08x}\t Found 0x{:08x}",
            expected, result
        )));
    }
    Ok(())
}

pub fn check_64(expected: u64, result: u64) -> CheckResult {
    if expected != result {
        return Err(Mismatch(format!(
            "Expected 0x{:016x}\t Found 0x{:016x}",
            expected, result
        )));
    }
    Ok(())
}

pub fn check_128(expected: QRegisterValue, result: QRegisterValue) -> CheckResult {
    if !expected.equals(&result) {
        return Err(Mismatch(format!(
            "Expected 0x{:016x}{:016x}\t Found 0x{:016x}{:016x}",
            expected.lane(1),
            expected.lane(0),
            result.lane(1),
            result.lane(0)
        )));
    }
    Ok(())
}

/// Decimal fields in the FP diagnostics carry a fixed count of digits after
/// the point (6, 9 and 17 for half, single and double), not significant
/// digits.
pub fn check_fp16(expected: Float16, result: Float16) -> CheckResult {
    if expected.to_bits() == result.to_bits() {
        return Ok(());
    }
    if expected.is_nan() || expected.is_zero() {
        Err(Mismatch(format!(
            "Expected 0x{:04x}\t Found 0x{:04x}",
            expected, result
        )))
    } else {
        Err(Mismatch(format!(
            "Expected {:.6} (16 bit): (0x{:04x})\t Found {:.6} (0x{:04x})",
            expected.to_f32(),
            expected,
            result.to_f32(),
            result
        )))
    }
}

pub fn check_fp32(expected: f32, result: f32) -> CheckResult {
    let e = expected.to_bits();
    let r = result.to_bits();
    if e == r {
        return Ok(());
    }
    if fp32_is_nan(e) || fp32_is_zero(e) {
        Err(Mismatch(format!("Expected 0x{:08x}\t Found 0x{:08x}", e, r)))
    } else {
        Err(Mismatch(format!(
            "Expected {:.9} (0x{:08x})\t Found {:.9} (0x{:08x})",
            expected, e, result, r
        )))
    }
}

pub fn check_fp64(expected: f64, result: f64) -> CheckResult {
    let e = expected.to_bits();
    let r = result.to_bits();
    if e == r {
        return Ok(());
    }
    if fp64_is_nan(e) || fp64_is_zero(e) {
        Err(Mismatch(format!(
            "Expected 0x{:016x}\t Found 0x{:016x}",
            e, r
        )))
    } else {
        Err(Mismatch(format!(
            "Expected {:.17} (0x{:016x})\t Found {:.17} (0x{:016x})",
            expected, e, result, r
        )))
    }
}

/// Compares a W view. The X register must have a clear upper half.
pub fn check_32_reg(expected: u32, core: &RegisterDump, reg: Register) -> CheckResult {
    assert!(reg.is_32_bits(), "{} is not a 32-bit view", reg);
    let result_x = core.xreg(reg.code());
    if result_x & 0xffff_ffff_0000_0000 != 0 {
        return Err(Mismatch(format!(
            "Expected 0x{:08x}\t Found 0x{:016x}",
            expected, result_x
        )));
    }
    check_32(expected, core.wreg(reg.code()))
}

pub fn check_64_reg(expected: u64, core: &RegisterDump, reg: Register) -> CheckResult {
    assert!(reg.is_64_bits(), "{} is not a 64-bit view", reg);
    check_64(expected, core.xreg(reg.code()))
}

pub fn check_128_reg(
    expected_h: u64,
    expected_l: u64,
    core: &RegisterDump,
    vreg: VRegister,
) -> CheckResult {
    assert!(vreg.is_128_bits(), "{} is not a 128-bit view", vreg);
    let mut expected = QRegisterValue::default();
    expected.set_lane(0, expected_l);
    expected.set_lane(1, expected_h);
    check_128(expected, core.qreg(vreg.code()))
}

/// Compares an H view. Bits 63:16 of the D register must be clear.
pub fn check_fp16_reg(expected: Float16, core: &RegisterDump, vreg: VRegister) -> CheckResult {
    assert!(vreg.is_16_bits(), "{} is not a 16-bit view", vreg);
    let result_64 = core.dreg_bits(vreg.code());
    if result_64 & 0xffff_ffff_ffff_0000 != 0 {
        return Err(Mismatch(format!(
            "Expected 0x{:04x} ({:.6})\t Found 0x{:016x}",
            expected,
            expected.to_f32(),
            result_64
        )));
    }
    check_fp16(expected, core.hreg(vreg.code()))
}

/// Compares an S view. Bits 63:32 of the D register must be clear.
pub fn check_fp32_reg(expected: f32, core: &RegisterDump, vreg: VRegister) -> CheckResult {
    assert!(vreg.is_32_bits(), "{} is not a 32-bit view", vreg);
    let result_64 = core.dreg_bits(vreg.code());
    if result_64 & 0xffff_ffff_0000_0000 != 0 {
        return Err(Mismatch(format!(
            "Expected 0x{:08x} ({:.6})\t Found 0x{:016x}",
            expected.to_bits(),
            expected,
            result_64
        )));
    }
    check_fp32(expected, core.sreg(vreg.code()))
}

pub fn check_fp64_reg(expected: f64, core: &RegisterDump, vreg: VRegister) -> CheckResult {
    assert!(vreg.is_64_bits(), "{} is not a 64-bit view", vreg);
    check_fp64(expected, core.dreg(vreg.code()))
}

/// `reg0` supplies the expected value, `reg1` the result, both from `core`.
pub fn check_64_regs(reg0: Register, core: &RegisterDump, reg1: Register) -> CheckResult {
    assert!(reg0.is_64_bits() && reg1.is_64_bits());
    check_64(core.xreg(reg0.code()), core.xreg(reg1.code()))
}

/// Raw bits of a D view.
pub fn check_64_vreg(expected: u64, core: &RegisterDump, vreg: VRegister) -> CheckResult {
    assert!(vreg.is_64_bits(), "{} is not a 64-bit view", vreg);
    check_64(expected, core.dreg_bits(vreg.code()))
}

/// Both operands are 4-bit flags words (N in bit 3). Undefined bits are a
/// usage error, not a mismatch.
pub fn check_nzcv(expected: u32, result: u32) -> CheckResult {
    assert_eq!(expected & !Nzcv::all().bits(), 0, "expected flags {:#x} has undefined bits", expected);
    assert_eq!(result & !Nzcv::all().bits(), 0, "result flags {:#x} has undefined bits", result);
    if expected != result {
        return Err(Mismatch(format!(
            "Expected: {}\t Found: {}",
            Nzcv::from_bits_retain(expected).letters(),
            Nzcv::from_bits_retain(result).letters()
        )));
    }
    Ok(())
}

/// Reports the first X register, then the first D register, that differs.
pub fn check_registers(a: &RegisterDump, b: &RegisterDump) -> CheckResult {
    for i in 0..NUMBER_OF_REGISTERS as u8 {
        if a.xreg(i) != b.xreg(i) {
            return Err(Mismatch(format!(
                "x{}\t Expected 0x{:016x}\t Found 0x{:016x}",
                i,
                a.xreg(i),
                b.xreg(i)
            )));
        }
    }

    for i in 0..NUMBER_OF_V_REGISTERS as u8 {
        let a_bits = a.dreg_bits(i);
        let b_bits = b.dreg_bits(i);
        if a_bits != b_bits {
            return Err(Mismatch(format!(
                "d{}\t Expected 0x{:016x}\t Found 0x{:016x}",
                i, a_bits, b_bits
            )));
        }
    }

    Ok(())
}

/// One lane of a Z register, at `lane_size_in_bytes`.
pub fn check_sve_lane(
    expected: u64,
    core: &RegisterDump,
    zreg: ZRegister,
    lane_size_in_bytes: usize,
    lane: usize,
) -> CheckResult {
    let result = core.zreg_lane(zreg.code(), lane_size_in_bytes, lane);
    let digits = lane_size_in_bytes * 2;
    if lane_size_in_bytes < 8 {
        let mask = (1u64 << (lane_size_in_bytes * 8)) - 1;
        assert_eq!(expected & !mask, 0, "expected value {:#x} is wider than the lane", expected);
    }
    if expected != result {
        return Err(Mismatch(format!(
            "z{}[{}]\t Expected 0x{:0w$x}\t Found 0x{:0w$x}",
            zreg.code(),
            lane,
            expected,
            result,
            w = digits
        )));
    }
    Ok(())
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes.iter().rev().map(|b| format!("{:02x}", b)).collect()
}

/// Predicate bits, little-endian bytes as stored.
pub fn check_p_register(expected: &[u8], core: &RegisterDump, preg: PRegister) -> CheckResult {
    let result = core.preg_bits(preg.code());
    assert_eq!(
        expected.len(),
        result.len(),
        "expected predicate is {} bytes, p{} is {}",
        expected.len(),
        preg.code(),
        result.len()
    );
    if expected != result {
        return Err(Mismatch(format!(
            "p{}\t Expected 0x{}\t Found 0x{}",
            preg.code(),
            hex_bytes(expected),
            hex_bytes(result)
        )));
    }
    Ok(())
}

pub fn equal_32(expected: u32, result: u32) -> bool {
    report(check_32(expected, result))
}

pub fn equal_64(expected: u64, result: u64) -> bool {
    report(check_64(expected, result))
}

pub fn equal_128(expected: QRegisterValue, result: QRegisterValue) -> bool {
    report(check_128(expected, result))
}

pub fn equal_fp16(expected: Float16, result: Float16) -> bool {
    report(check_fp16(expected, result))
}

pub fn equal_fp32(expected: f32, result: f32) -> bool {
    report(check_fp32(expected, result))
}

pub fn equal_fp64(expected: f64, result: f64) -> bool {
    report(check_fp64(expected, result))
}

pub fn equal_32_reg(expected: u32, core: &RegisterDump, reg: Register) -> bool {
    report(check_32_reg(expected, core, reg))
}

pub fn equal_64_reg(expected: u64, core: &RegisterDump, reg: Register) -> bool {
    report(check_64_reg(expected, core, reg))
}

pub fn equal_128_reg(expected_h: u64, expected_l: u64, core: &RegisterDump, vreg: VRegister) -> bool {
    report(check_128_reg(expected_h, expected_l, core, vreg))
}

pub fn equal_fp16_reg(expected: Float16, core: &RegisterDump, vreg: VRegister) -> bool {
    report(check_fp16_reg(expected, core, vreg))
}

pub fn equal_fp32_reg(expected: f32, core: &RegisterDump, vreg: VRegister) -> bool {
    report(check_fp32_reg(expected, core, vreg))
}

pub fn equal_fp64_reg(expected: f64, core: &RegisterDump, vreg: VRegister) -> bool {
    report(check_fp64_reg(expected, core, vreg))
}

pub fn equal_64_regs(reg0: Register, core: &RegisterDump, reg1: Register) -> bool {
    report(check_64_regs(reg0, core, reg1))
}

pub fn equal_64_vreg(expected: u64, core: &RegisterDump, vreg: VRegister) -> bool {
    report(check_64_vreg(expected, core, vreg))
}

pub fn equal_nzcv(expected: u32, result: u32) -> bool {
    report(check_nzcv(expected, result))
}

pub fn equal_registers(a: &RegisterDump, b: &RegisterDump) -> bool {
    report(check_registers(a, b))
}

pub fn equal_sve_lane(
    expected: u64,
    core: &RegisterDump,
    zreg: ZRegister,
    lane_size_in_bytes: usize,
    lane: usize,
) -> bool {
    report(check_sve_lane(expected, core, zreg, lane_size_in_bytes, lane))
}

pub fn equal_p_register(expected: &[u8], core: &RegisterDump, preg: PRegister) -> bool {
    report(check_p_register(expected, core, preg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_32() {
        for v in [0u32, 1, 0x8000_0000, 0xdead_beef, u32::MAX] {
            assert!(equal_32(v, v));
            assert!(!equal_32(v, v ^ 1));
        }
        assert_eq!(
            check_32(0x1234, 0x5678).unwrap_err().message(),
            "Expected 0x00001234\t Found 0x00005678"
        );
    }

    #[test]
    fn test_equal_128_lanes() {
        let a = QRegisterValue::new(1, 2);
        assert!(equal_128(a, QRegisterValue::new(1, 2)));
        assert!(!equal_128(a, QRegisterValue::new(0, 2)));
        assert!(!equal_128(a, QRegisterValue::new(1, 0)));
        assert_eq!(
            check_128(a, QRegisterValue::new(3, 4)).unwrap_err().to_string(),
            "Expected 0x00000000000000010000000000000002\t Found 0x00000000000000030000000000000004"
        );
    }

    #[test]
    fn test_nan_payloads_differ() {
        let a = f32::from_bits(0x7fc0_0001);
        let b = f32::from_bits(0x7fc0_0002);
        assert!(equal_fp32(a, a));
        assert!(!equal_fp32(a, b));
        assert_eq!(
            check_fp32(a, b).unwrap_err().message(),
            "Expected 0x7fc00001\t Found 0x7fc00002"
        );

        let qnan = f64::from_bits(FP64_QUIET_NAN);
        let snan = f64::from_bits(FP64_SIGNALLING_NAN);
        assert!(equal_fp64(qnan, qnan));
        assert!(!equal_fp64(qnan, snan));
        assert!(!equal_fp16(FP16_QUIET_NAN, FP16_SIGNALLING_NAN));
    }

    #[test]
    fn test_signed_zero_differs() {
        assert!(!equal_fp64(0.0, -0.0));
        assert!(!equal_fp32(-0.0, 0.0));
        assert!(!equal_fp16(Float16::from_bits(0x0000), Float16::from_bits(0x8000)));
        assert_eq!(
            check_fp64(0.0, -0.0).unwrap_err().message(),
            "Expected 0x0000000000000000\t Found 0x8000000000000000"
        );
    }

    #[test]
    fn test_decimal_rendering() {
        assert_eq!(
            check_fp32(1.5, 2.0).unwrap_err().message(),
            "Expected 1.500000000 (0x3fc00000)\t Found 2.000000000 (0x40000000)"
        );
        assert_eq!(
            check_fp64(1.0, 0.5).unwrap_err().message(),
            "Expected 1.00000000000000000 (0x3ff0000000000000)\t Found 0.50000000000000000 (0x3fe0000000000000)"
        );
        assert_eq!(
            check_fp16(Float16::from_bits(0x3c00), Float16::from_bits(0xc000))
                .unwrap_err()
                .message(),
            "Expected 1.000000 (16 bit): (0x3c00)\t Found -2.000000 (0xc000)"
        );
    }

    #[test]
    fn test_decimal_digits_follow_the_point() {
        // Large and small magnitudes keep the same fractional width.
        assert_eq!(
            check_fp32(1234.5, 1.0).unwrap_err().message(),
            "Expected 1234.500000000 (0x449a5000)\t Found 1.000000000 (0x3f800000)"
        );
        assert_eq!(
            check_fp64(0.001, 1.0).unwrap_err().message(),
            "Expected 0.00100000000000000 (0x3f50624dd2f1a9fc)\t Found 1.00000000000000000 (0x3ff0000000000000)"
        );
    }

    #[test]
    fn test_nzcv_letters() {
        assert!(equal_nzcv(0b1001, 0b1001));
        assert!(!equal_nzcv(0b1001, 0b0110));
        assert_eq!(
            check_nzcv(0b1001, 0b0110).unwrap_err().message(),
            "Expected: NzcV\t Found: nZCv"
        );
    }

    #[test]
    #[should_panic(expected = "undefined bits")]
    fn test_nzcv_undefined_bits() {
        equal_nzcv(0b1_0000, 0);
    }
}

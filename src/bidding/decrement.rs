/// 입찰 감소 단위 규칙
///
/// 금액은 정확한 이진 소수가 아니므로 `gap / step`이 정수에 상대 오차
/// `STEP_TOLERANCE` 이내로 가까우면 배수로 본다.
pub const STEP_TOLERANCE: f64 = 1e-9;

/// `gap`(기준가 - 입찰가)이 `step`의 유효한 감소폭인지 확인
///
/// - `step == 0`: 양수 감소폭이면 모두 유효
/// - `step > 0`: 감소폭이 양수이고 `step`의 1배 이상 정수배일 때만 유효
pub fn is_valid_step(step: f64, gap: f64) -> bool {
    if !gap.is_finite() || gap <= 0.0 {
        return false;
    }
    if step <= 0.0 {
        return true;
    }

    let ratio = gap / step;
    let nearest = ratio.round();
    nearest >= 1.0 && (ratio - nearest).abs() <= STEP_TOLERANCE * ratio.abs().max(1.0)
}

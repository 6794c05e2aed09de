// ==========================================
// 库存台账分析系统 - 统计工具
// ==========================================
// 职责: 均值 / 标准差 / 分位数 / 变异系数 / 归一化 / 线性回归
// 标准差: KPI 变异系数用总体口径（ddof = 0），其余波动指标用样本口径（ddof = 1）
// 约定: 空输入与零均值一律返回 0，不产生 NaN
// ==========================================

/// 视为零的阈值
pub const ZERO_EPS: f64 = 1e-12;

/// 算术平均（空 → 0）
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// 总体标准差（ddof = 0；空 → 0）
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// 样本标准差（ddof = 1；不足 2 个值 → 0）
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// 变异系数 std / mean，总体口径（均值为 0 → 0）
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m.abs() < ZERO_EPS {
        return 0.0;
    }
    population_std(values) / m
}

/// 变异系数 std / mean，样本口径（均值为 0 或不足 2 个值 → 0）
pub fn sample_coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m.abs() < ZERO_EPS {
        return 0.0;
    }
    sample_std(values) / m
}

/// 分位数（线性插值，q ∈ [0, 1]；空 → 0）
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// min-max 归一化到 [0, 1]；取值全相同 → 全 0
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if values.is_empty() || range.abs() < ZERO_EPS {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

// ==========================================
// 线性回归
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_value: f64,
    pub p_value: f64, // 双侧，H0: slope = 0
    pub std_err: f64,
}

/// 最小二乘拟合 y = slope·x + intercept
///
/// 至少 3 个点（自由度 n−2 ≥ 1）；x 全相同时返回 None
pub fn linear_regression(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = x.len();
    if n != y.len() || n < 3 {
        return None;
    }

    let x_mean = mean(x);
    let y_mean = mean(y);
    let nf = n as f64;
    let ssxm = x.iter().map(|v| (v - x_mean).powi(2)).sum::<f64>() / nf;
    let ssym = y.iter().map(|v| (v - y_mean).powi(2)).sum::<f64>() / nf;
    let ssxym = x
        .iter()
        .zip(y)
        .map(|(a, b)| (a - x_mean) * (b - y_mean))
        .sum::<f64>()
        / nf;

    if ssxm.abs() < ZERO_EPS {
        return None;
    }

    let denom = (ssxm * ssym).sqrt();
    let r = if denom.abs() < ZERO_EPS {
        0.0
    } else {
        (ssxym / denom).clamp(-1.0, 1.0)
    };

    let slope = ssxym / ssxm;
    let intercept = y_mean - slope * x_mean;
    let df = nf - 2.0;

    // 防止 r = ±1 时除零
    const TINY: f64 = 1e-20;
    let t = r * (df / ((1.0 - r + TINY) * (1.0 + r + TINY))).sqrt();
    let p_value = student_t_two_tailed_p(t, df);
    let std_err = ((1.0 - r * r).max(0.0) * ssym / ssxm / df).sqrt();

    Some(LinearFit {
        slope,
        intercept,
        r_value: r,
        p_value,
        std_err,
    })
}

// ==========================================
// Student t 分布
// ==========================================

/// 双侧 p 值 P(|T| ≥ |t|)，df 自由度
///
/// p = I_{df/(df+t²)}(df/2, 1/2)
pub fn student_t_two_tailed_p(t: f64, df: f64) -> f64 {
    if df <= 0.0 || t.is_nan() {
        return 1.0;
    }
    if t.is_infinite() {
        return 0.0;
    }
    let x = df / (df + t * t);
    regularized_incomplete_beta(df / 2.0, 0.5, x).clamp(0.0, 1.0)
}

/// 正则化不完全 Beta 函数 I_x(a, b)
fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    // 连分式在 x < (a+1)/(a+b+2) 时收敛快，否则用对称关系
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 300;
    const EPS: f64 = 3e-14;
    const FPMIN: f64 = 1e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < FPMIN {
        d = FPMIN;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// ln Γ(x)（Lanczos 近似，g = 7）
fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEF: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    let pi = std::f64::consts::PI;

    if x < 0.5 {
        // 反射公式
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let t = x + G + 0.5;
    let mut a = COEF[0];
    for (i, c) in COEF.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    0.5 * (2.0 * pi).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_zero_guards() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(population_std(&[]), 0.0);
        assert_eq!(coefficient_of_variation(&[]), 0.0);
        assert_eq!(coefficient_of_variation(&[-1.0, 1.0]), 0.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
        assert_eq!(min_max_normalize(&[3.0, 3.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_population_std() {
        assert!(approx(population_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0, 1e-12));
    }

    #[test]
    fn test_sample_std() {
        // [3, 5]: 方差 2 → 1.414…
        assert!(approx(sample_std(&[3.0, 5.0]), 2f64.sqrt(), 1e-12));
        assert!(approx(population_std(&[3.0, 5.0]), 1.0, 1e-12));
        assert_eq!(sample_std(&[4.0]), 0.0);
        assert_eq!(sample_std(&[]), 0.0);

        assert!(approx(sample_coefficient_of_variation(&[3.0, 5.0]), 2f64.sqrt() / 4.0, 1e-12));
        assert_eq!(sample_coefficient_of_variation(&[4.0]), 0.0);
        assert_eq!(sample_coefficient_of_variation(&[-1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        let v = [4.0, 1.0, 3.0, 2.0];
        assert!(approx(percentile(&v, 0.5), 2.5, 1e-12));
        assert!(approx(percentile(&v, 0.25), 1.75, 1e-12));
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 1.0), 4.0);
        assert_eq!(percentile(&[7.0], 0.9), 7.0);
    }

    #[test]
    fn test_min_max_normalize() {
        assert_eq!(min_max_normalize(&[0.0, 5.0, 10.0]), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_ln_gamma_known_values() {
        assert!(approx(ln_gamma(1.0), 0.0, 1e-10));
        assert!(approx(ln_gamma(5.0), 24f64.ln(), 1e-10));
        assert!(approx(ln_gamma(0.5), std::f64::consts::PI.sqrt().ln(), 1e-10));
    }

    #[test]
    fn test_student_t_p_values() {
        // Cauchy: P(|T| > 1) = 0.5
        assert!(approx(student_t_two_tailed_p(1.0, 1.0), 0.5, 1e-9));
        // df = 2: p = 1 - sqrt(1 - 1/3)
        assert!(approx(student_t_two_tailed_p(2.0, 2.0), 1.0 - (2.0f64 / 3.0).sqrt(), 1e-9));
        assert!(approx(student_t_two_tailed_p(0.0, 5.0), 1.0, 1e-12));
        // 临界值 t(0.975, 10) = 2.228139
        assert!(approx(student_t_two_tailed_p(2.228139, 10.0), 0.05, 1e-5));
    }

    #[test]
    fn test_linear_regression_perfect_line() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [10.0, 12.0, 14.0, 16.0];
        let fit = linear_regression(&x, &y).unwrap();
        assert!(approx(fit.slope, 2.0, 1e-12));
        assert!(approx(fit.intercept, 10.0, 1e-12));
        assert!(approx(fit.r_value, 1.0, 1e-12));
        assert!(fit.p_value < 1e-6);
        assert!(approx(fit.std_err, 0.0, 1e-9));
    }

    #[test]
    fn test_linear_regression_flat_and_degenerate() {
        let fit = linear_regression(&[0.0, 1.0, 2.0], &[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.r_value, 0.0);
        assert!(approx(fit.p_value, 1.0, 1e-12));

        assert!(linear_regression(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_none());
        assert!(linear_regression(&[0.0, 1.0], &[1.0, 2.0]).is_none());
    }
}

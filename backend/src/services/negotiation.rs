//! # 약속 협상 규칙
//!
//! DB와 무관한 순수 함수들입니다. `db` 모듈이 읽고 쓰는 사이에 이 함수들로
//! 값을 계산합니다.
//!
//! 이 모듈의 함수들:
//! - `dedupe()`: 제출 목록의 중복 제거 (먼저 나온 값 유지, 순서 보존)
//! - `intersect()`: 두 목록의 교집합 (문자열 완전 일치)
//! - `resolve()`: 카테고리별 교집합 계산
//! - `merge_mutual()`: 새 교집합을 기존 합의 위에 병합
//! - `pick_final()`: 합의 목록에서 최종 장소/날짜/시간 선택

use crate::models::{Category, MutualAgreement, PreferenceSubmission};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// 목록에서 중복을 제거합니다. 처음 나온 순서를 유지합니다.
///
/// 공백 제거나 대소문자 변환은 하지 않습니다 — 값은 불투명한 문자열입니다.
pub fn dedupe(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

/// `other ∩ own` — 상대방 목록의 순서를 따릅니다.
///
/// 비교는 대소문자를 구분하는 완전 일치입니다 ("park" ≠ "Park").
pub fn intersect(other: &[String], own: &[String]) -> Vec<String> {
    let own: HashSet<&str> = own.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut mutual = Vec::new();
    for value in other {
        if own.contains(value.as_str()) && seen.insert(value.as_str()) {
            mutual.push(value.clone());
        }
    }
    mutual
}

/// 카테고리별 교집합 결과. 교집합이 비면 None.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub places: Option<Vec<String>>,
    pub dates: Option<Vec<String>>,
    pub times: Option<Vec<String>>,
}

impl Resolution {
    /// 하나 이상의 카테고리에서 교집합이 생겼는지
    pub fn has_mutual(&self) -> bool {
        self.places.is_some() || self.dates.is_some() || self.times.is_some()
    }
}

/// 상대방의 제출과 내 선택 목록으로 세 카테고리의 교집합을 각각 계산합니다.
pub fn resolve(
    other: &PreferenceSubmission,
    own_places: &[String],
    own_dates: &[String],
    own_times: &[String],
) -> Resolution {
    let non_empty = |category: Category, own: &[String]| {
        Some(intersect(other.list(category), own)).filter(|values| !values.is_empty())
    };
    Resolution {
        places: non_empty(Category::Places, own_places),
        dates: non_empty(Category::Dates, own_dates),
        times: non_empty(Category::Times, own_times),
    }
}

/// 기존 합의 위에 새 결과를 병합합니다.
///
/// 새로 교집합이 생긴 카테고리만 덮어쓰고, 나머지는 기존 값을 유지합니다.
/// 한 번 합의된 카테고리는 이후 계산에서 교집합이 비더라도 지워지지 않습니다
/// (지우는 것은 거절뿐입니다).
pub fn merge_mutual(
    existing: Option<&MutualAgreement>,
    resolution: Resolution,
) -> (Option<Vec<String>>, Option<Vec<String>>, Option<Vec<String>>) {
    let keep = |fresh: Option<Vec<String>>, category: Category| {
        fresh.or_else(|| {
            existing
                .and_then(|mutual| mutual.list(category))
                .map(<[String]>::to_vec)
        })
    };
    (
        keep(resolution.places, Category::Places),
        keep(resolution.dates, Category::Dates),
        keep(resolution.times, Category::Times),
    )
}

/// 최종 약속으로 고른 값
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalChoice {
    pub place: String,
    pub date: String,
    pub time: String,
}

/// 합의 목록에서 최종 장소/날짜/시간을 하나씩 고릅니다.
///
/// - 장소, 시간: 합의 목록에서 균등 무작위 선택
/// - 날짜: 무작위가 아니라 문자열 정렬상 **가장 이른** 날짜
///
/// 세 카테고리 중 하나라도 합의가 없으면 None.
pub fn pick_final<R: Rng + ?Sized>(mutual: &MutualAgreement, rng: &mut R) -> Option<FinalChoice> {
    let place = mutual.list(Category::Places)?.choose(rng)?;
    let date = mutual.list(Category::Dates)?.iter().min()?;
    let time = mutual.list(Category::Times)?.choose(rng)?;
    Some(FinalChoice {
        place: place.clone(),
        date: date.clone(),
        time: time.clone(),
    })
}

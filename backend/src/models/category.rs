//! # 협상 카테고리
//!
//! 약속은 장소(Places), 날짜(Dates), 시간(Times) 세 카테고리로 나뉘어
//! 각각 따로 합의되고 따로 거절될 수 있습니다.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 협상 카테고리
///
/// JSON/DB에는 정규 표기(`"Places"`, `"Dates"`, `"Times"`)로 저장됩니다.
/// `Ord`를 구현하므로 `BTreeMap`/`BTreeSet`의 키로 쓸 수 있습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Places,
    Dates,
    Times,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Places, Category::Dates, Category::Times];

    /// 정규 표기 (대문자로 시작하는 복수형)
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Places => "Places",
            Category::Dates => "Dates",
            Category::Times => "Times",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 사용자 입력을 카테고리로 정규화합니다.
///
/// 대소문자를 구분하지 않고 단수/복수를 모두 받습니다:
/// `"dates"`, `"Date"`, `"TIMES"` → `Dates`, `Dates`, `Times`
impl FromStr for Category {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "place" | "places" => Ok(Category::Places),
            "date" | "dates" => Ok(Category::Dates),
            "time" | "times" => Ok(Category::Times),
            _ => Err(AppError::BadRequest(format!("Unknown category '{}'", raw))),
        }
    }
}

/// 카테고리별 참/거짓 표시
///
/// `checkFixedMeetDetails`(합의 완료 여부)와
/// `checkRejectionStatus`(내가 거절한 카테고리) 응답에 같이 쓰입니다.
/// JSON: `{ "place": true, "date": false, "time": true }`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFlags {
    pub place: bool,
    pub date: bool,
    pub time: bool,
}

impl CategoryFlags {
    pub fn set(&mut self, category: Category, value: bool) {
        match category {
            Category::Places => self.place = value,
            Category::Dates => self.date = value,
            Category::Times => self.time = value,
        }
    }

    pub fn all(&self) -> bool {
        self.place && self.date && self.time
    }

    pub fn any(&self) -> bool {
        self.place || self.date || self.time
    }
}

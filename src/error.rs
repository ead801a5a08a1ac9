use thiserror::Error;

/// Problems with what the user entered or did.
///
/// Reported back immediately; the state is left untouched so the user can
/// correct and retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("선택 영역이 너무 작습니다 (최소 {min}px)")]
    SelectionTooSmall { min: f64 },

    #[error("먼저 품번 영역을 선택해주세요")]
    NoSelection,

    #[error("이미지가 없습니다. 먼저 사진을 불러오세요")]
    NoImage,

    #[error("품번을 입력해주세요")]
    MissingProductNumber,

    #[error("수량을 입력해주세요")]
    MissingQuantity,

    #[error("수량은 1 이상의 정수여야 합니다: {0}")]
    InvalidQuantity(String),

    #[error("{0}번 항목이 없습니다")]
    NoSuchItem(usize),

    #[error("단위명을 입력해주세요")]
    EmptyUnit,

    #[error("이미 인식 중입니다")]
    RecognitionInProgress,
}

//! Prompt templates sent to the inference service.
//!
//! The buoy carries a tilt sensor at the centre of a 20 x 20 cm box, facing
//! down, and a camera looking at the water surface. The wording of the
//! templates and the wave labels are what the downstream dashboard expects
//! back, so they are kept in Korean.

use std::fmt;

/// Categorical wave direction the model must choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaveDirection {
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
    UpperRightToLowerLeft,
    UpperLeftToLowerRight,
    LowerRightToUpperLeft,
    LowerLeftToUpperRight,
    Calm,
}

impl WaveDirection {
    /// Every direction, in the order it is listed in the prompt
    pub const ALL: [Self; 9] = [
        Self::LeftToRight,
        Self::RightToLeft,
        Self::TopToBottom,
        Self::BottomToTop,
        Self::UpperRightToLowerLeft,
        Self::UpperLeftToLowerRight,
        Self::LowerRightToUpperLeft,
        Self::LowerLeftToUpperRight,
        Self::Calm,
    ];

    /// Label the model is asked to answer with
    pub const fn label(self) -> &'static str {
        match self {
            Self::LeftToRight => "왼쪽에서 오른쪽",
            Self::RightToLeft => "오른쪽에서 왼쪽",
            Self::TopToBottom => "위쪽에서 아래쪽",
            Self::BottomToTop => "아래쪽에서 위쪽",
            Self::UpperRightToLowerLeft => "대각선 오른쪽 위에서 대각선 왼쪽 아래",
            Self::UpperLeftToLowerRight => "대각선 왼쪽 위에서 대각선 오른쪽 아래",
            Self::LowerRightToUpperLeft => "대각선 오른쪽 아래에서 대각선 왼쪽 위로",
            Self::LowerLeftToUpperRight => "대각선 왼쪽 아래에서 대각선 오른쪽 위로",
            Self::Calm => "잔잔함",
        }
    }

    /// Find the direction named in a model answer such as
    /// `"파도의 방향": "잔잔함"`.
    ///
    /// Longer labels are matched first so a diagonal is never mistaken for one
    /// of the straight directions.
    pub fn from_response(text: &str) -> Option<Self> {
        let mut candidates = Self::ALL;
        candidates.sort_by_key(|d| std::cmp::Reverse(d.label().len()));
        candidates.into_iter().find(|d| text.contains(d.label()))
    }
}

impl fmt::Display for WaveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Instruction for a camera frame: classify trash (yellow) and marine life
/// (green) and report their coordinates, corrected by the last known Z-axis
/// rotation.
pub fn object_positions(z: f64) -> String {
    format!(
        "\
현재 기울기 정보는 다음과 같아:

Z축 : {z}

기울기 센서 축 값은 다음과 같이 읽어:

- Z 축: 센서가 수평축(좌/우) 방향으로 회전할 때 값이 변화합니다.
- 센서가 시계 방향으로 회전하면 Z 축 값이 양수(+)가 됩니다.
- 센서가 반시계 방향으로 회전하면 Z 축 값이 음수(-)가 됩니다.

기울기 센서는 네모난 20*20(단위 cm)인 통의 정가운데에 고정되어 있으며, 통 아래쪽을 향해 설치되어 있습니다.
센서의 기울기에 따라 물체들의 상대적 위치가 달라집니다.

이미지를 분석하여 다음을 수행해줘:
1. 이미지에서 노란색 물체는 쓰레기이고 초록색 물체는 해양 생물로 식별해줘.
2. 이미지에서 각 물체의 좌표를 식별하여 알려줘. 좌표는 0,0에서 20,20 범위로 정해줘.
3. Z축을 분석하여서 부표가 회전되어도 사진과 Z축 정보만으로 쓰레기와 해양 생물의 위치를 알려줘
다른 말은 하지 말고 오직 JSON으로만 응답해줘.
쓰레기들의 각각의 좌표
해양 생물들의 각각의 좌표
"
    )
}

/// Instruction for a tilt reading: pick exactly one [`WaveDirection`].
pub fn wave_direction(x: f64, y: f64, z: f64) -> String {
    let choices = WaveDirection::ALL
        .iter()
        .map(|d| d.label())
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "\
현재 기울기 정보는 다음과 같아:

X축: {x}
Y축: {y}
Z축: {z}
기울기 센서 축 값은 다음과 같이 읽어:

X 축: 센서가 앞뒤로 기울어질 때 값이 변화합니다.
센서가 앞으로 기울면 X 축 값이 -가 됩니다.
센서가 뒤로 기울면 X 축 값이 +가 됩니다.
Y 축: 센서가 좌우로 기울어질 때 값이 변화합니다.
센서가 왼쪽으로 기울면 Y 축 값이 -가 됩니다.
센서가 오른쪽으로 기울면 Y 축 값이 +가 됩니다.
Z 축: 센서가 수평축(좌/우) 방향으로 회전할 때 값이 변화합니다.
센서가 시계 방향으로 회전하면 Z 축 값이 양수(+)가 됩니다.
센서가 반시계 방향으로 회전하면 Z 축 값이 음수(-)가 됩니다.
기울기 센서는 네모난 20*20(단위 cm)인 통의 정가운데에 있으며, 통 아래쪽을 향해 설치되어 있습니다.
기울기 센서의 Z축을 기준으로 센서가 바라보는 방향을 찾고, X축과 Y축을 통해 파도의 방향을 구합니다.

X축과 Y축 값의 변경이 작으면 '{calm}'이라고 판단합니다. X축과 Y축 값의 변경 폭이 엄청 크지 않으면 웬만하면 '{calm}'으로 판단합니다.
만약 파도가 여러 방향에서 나타나면 세기가 더 센 방향 하나만 알려줍니다.

너의 응답은 JSON 형식으로만 알려줘. 다른 말은 필요없어. 이유나 설명 등 다른 말은 하지 말아줘 파도의 방향 정보 하나만 알려줘 파도의 방향을 다음 중 하나로만 말해줘:

{choices}
아래는 응답하는 형식이야
\"파도의 방향\": \"여기에 방향을 입력\" 이 문장 딱 하나만 출력해줘
",
        calm = WaveDirection::Calm.label(),
    )
}

//! 합성 이벤트 생성기 -- 정상/공격 HTTP 접근 로그 생성
//!
//! 모든 함수는 호출자가 넘긴 난수 생성기만 사용하며, 유일한 부수효과는
//! 프로세스 전역 레코드 시퀀스([`RecordId::next`])를 소비하는 것입니다.
//! 실패 경로는 없습니다.
//!
//! 원본 로그 라인(`raw`)은 Apache combined 형식을 따릅니다:
//! `{ip} - - [{ts}] "{method} {endpoint} HTTP/1.1" {status} {bytes} "{ua}"`

use rand::Rng;
use sentinel_core::types::{AttackKind, LogRecord, RecordId, now_iso8601};

/// 내부망 IP 풀 (정상 트래픽)
pub const INTERNAL_IPS: [&str; 4] = ["192.168.1.5", "192.168.1.12", "10.0.0.45", "172.16.0.22"];

/// 외부 IP 풀 (공격 트래픽)
pub const EXTERNAL_IPS: [&str; 4] = ["45.23.11.2", "89.12.34.55", "203.0.113.5", "198.51.100.23"];

/// 요청 경로 풀. 정상 트래픽은 앞의 6개만 사용합니다.
pub const ENDPOINTS: [&str; 8] = [
    "/api/v1/users",
    "/login",
    "/dashboard",
    "/assets/logo.png",
    "/api/v1/products",
    "/contact",
    "/admin/settings",
    "/wp-admin",
];

/// User-Agent 풀. 정상 트래픽은 앞의 2개(브라우저)만 사용합니다.
pub const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)",
    "Python-urllib/3.8",
    "curl/7.64.1",
    "sqlmap/1.5.2",
];

const BENIGN_ENDPOINT_COUNT: usize = 6;
const BROWSER_AGENT_COUNT: usize = 2;
const BENIGN_STATUSES: [u16; 3] = [200, 201, 304];
const BENIGN_METHODS: [&str; 2] = ["GET", "POST"];
const BENIGN_RESPONSE_BYTES: u32 = 512;
const ATTACK_RESPONSE_BYTES: u32 = 124;

const BENIGN_MESSAGE: &str = "Request processed successfully";
const ATTACK_MESSAGE: &str = "Suspicious request pattern detected";

/// 트래픽 구성 비율
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficMix {
    /// 공격 레코드 확률 (0.0~1.0)
    pub attack_ratio: f64,
}

impl TrafficMix {
    /// 주어진 공격 비율로 구성을 만듭니다. 범위 밖 값은 0.0~1.0으로 잘립니다.
    pub fn new(attack_ratio: f64) -> Self {
        let attack_ratio = if attack_ratio.is_finite() {
            attack_ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { attack_ratio }
    }
}

impl Default for TrafficMix {
    fn default() -> Self {
        Self { attack_ratio: 0.2 }
    }
}

/// 공격 유형별 요청 형태
struct AttackShape {
    method: &'static str,
    endpoint: &'static str,
    payload: &'static str,
    status: u16,
    forced_agent: Option<&'static str>,
}

fn attack_shape(kind: AttackKind) -> AttackShape {
    match kind {
        AttackKind::SqlInjection => AttackShape {
            method: "GET",
            endpoint: "/api/v1/products",
            payload: "?id=1' OR '1'='1",
            status: 200,
            forced_agent: Some("sqlmap/1.5.2"),
        },
        AttackKind::Xss => AttackShape {
            method: "POST",
            endpoint: "/contact",
            payload: "<script>alert(document.cookie)</script>",
            status: 200,
            forced_agent: None,
        },
        AttackKind::BruteForce => AttackShape {
            method: "POST",
            endpoint: "/login",
            payload: "",
            status: 401,
            forced_agent: None,
        },
        AttackKind::PathTraversal => AttackShape {
            method: "GET",
            endpoint: "/../../../../etc/passwd",
            payload: "",
            status: 404,
            forced_agent: None,
        },
    }
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, pool: &[&'a str]) -> &'a str {
    pool[rng.random_range(0..pool.len())]
}

fn combined_log_line(
    ip: &str,
    timestamp: &str,
    method: &str,
    endpoint: &str,
    status: u16,
    bytes: u32,
    user_agent: &str,
) -> String {
    format!("{ip} - - [{timestamp}] \"{method} {endpoint} HTTP/1.1\" {status} {bytes} \"{user_agent}\"")
}

/// 정상 트래픽 레코드를 생성합니다.
pub fn generate_benign<R: Rng + ?Sized>(rng: &mut R) -> LogRecord {
    let ip = pick(rng, &INTERNAL_IPS);
    let method = pick(rng, &BENIGN_METHODS);
    let endpoint = pick(rng, &ENDPOINTS[..BENIGN_ENDPOINT_COUNT]);
    let status = BENIGN_STATUSES[rng.random_range(0..BENIGN_STATUSES.len())];
    let user_agent = pick(rng, &USER_AGENTS[..BROWSER_AGENT_COUNT]);
    let timestamp = now_iso8601();

    let raw = combined_log_line(
        ip,
        &timestamp,
        method,
        endpoint,
        status,
        BENIGN_RESPONSE_BYTES,
        user_agent,
    );

    LogRecord {
        id: RecordId::next(),
        timestamp,
        source_ip: ip.to_owned(),
        method: method.to_owned(),
        endpoint: endpoint.to_owned(),
        status_code: status,
        message: BENIGN_MESSAGE.to_owned(),
        raw,
    }
}

/// 지정한 유형의 공격 레코드를 생성합니다.
pub fn generate_attack<R: Rng + ?Sized>(rng: &mut R, kind: AttackKind) -> LogRecord {
    let shape = attack_shape(kind);
    let ip = pick(rng, &EXTERNAL_IPS);
    let user_agent = match shape.forced_agent {
        Some(agent) => agent,
        None => pick(rng, &USER_AGENTS),
    };
    let timestamp = now_iso8601();
    let endpoint = format!("{}{}", shape.endpoint, shape.payload);

    let raw = combined_log_line(
        ip,
        &timestamp,
        shape.method,
        &endpoint,
        shape.status,
        ATTACK_RESPONSE_BYTES,
        user_agent,
    );

    LogRecord {
        id: RecordId::next(),
        timestamp,
        source_ip: ip.to_owned(),
        method: shape.method.to_owned(),
        endpoint,
        status_code: shape.status,
        message: ATTACK_MESSAGE.to_owned(),
        raw,
    }
}

/// 공격 유형을 균등 확률로 고릅니다.
pub fn random_attack_kind<R: Rng + ?Sized>(rng: &mut R) -> AttackKind {
    AttackKind::ALL[rng.random_range(0..AttackKind::ALL.len())]
}

/// 구성 비율에 따라 정상 또는 공격 레코드를 생성합니다.
pub fn generate_random<R: Rng + ?Sized>(rng: &mut R, mix: TrafficMix) -> LogRecord {
    if rng.random_bool(mix.attack_ratio) {
        let kind = random_attack_kind(rng);
        generate_attack(rng, kind)
    } else {
        generate_benign(rng)
    }
}

/// 单帧允许提交的最大关键点数量（面网格 478 点，留出余量）
pub const MAX_KEYPOINTS_PER_FRAME: usize = 1024;

/// 会话事件广播通道容量
pub const SESSION_EVENT_CHANNEL_CAPACITY: usize = 256;

/// SSE keep-alive 间隔（秒）
pub const SSE_KEEPALIVE_SECS: u64 = 15;

/// 请求体大小上限：每帧约 478 个坐标对，256 KiB 足够
pub const MAX_BODY_SIZE: usize = 256 * 1024;

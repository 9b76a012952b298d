use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "chat-translator")]
#[command(about = "Translation dispatch service for chat messages", long_about = None)]
pub struct Config {
	/// Address the HTTP surface binds to
	#[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8090")]
	pub bind_addr: String,

	/// Initial number of translation workers
	#[arg(long, env = "WORKERS_DEFAULT", default_value = "4")]
	pub workers_default: usize,

	/// Minimum number of workers the supervisor keeps alive
	#[arg(long, env = "WORKERS_MIN", default_value = "2")]
	pub workers_min: usize,

	/// Maximum number of workers the supervisor may scale to
	#[arg(long, env = "WORKERS_MAX", default_value = "16")]
	pub workers_max: usize,

	/// Bounded job queue capacity
	#[arg(long, env = "QUEUE_CAPACITY", default_value = "256")]
	pub queue_capacity: usize,

	/// Queue depth that triggers scaling up
	#[arg(long, env = "SCALE_UP_DEPTH", default_value = "64")]
	pub scale_up_depth: usize,

	/// Queue depth that allows scaling down
	#[arg(long, env = "SCALE_DOWN_DEPTH", default_value = "4")]
	pub scale_down_depth: usize,

	/// Scaling check interval in seconds
	#[arg(long, env = "SCALING_INTERVAL_SECS", default_value = "30")]
	pub scaling_interval_secs: u64,

	/// Batch accumulation window in milliseconds
	#[arg(long, env = "BATCH_WINDOW_MS", default_value = "50")]
	pub batch_window_ms: u64,

	/// Maximum requests per batch
	#[arg(long, env = "BATCH_MAX_SIZE", default_value = "10")]
	pub batch_max_size: usize,

	/// Hard bound on how long a caller waits for a result, in seconds
	#[arg(long, env = "WAIT_TIMEOUT_SECS", default_value = "10")]
	pub wait_timeout_secs: u64,

	/// Result store poll interval in milliseconds
	#[arg(long, env = "POLL_INTERVAL_MS", default_value = "500")]
	pub poll_interval_ms: u64,

	/// How long completed results stay readable, in seconds
	#[arg(long, env = "RESULT_RETENTION_SECS", default_value = "300")]
	pub result_retention_secs: u64,

	/// Result store sweep interval in seconds
	#[arg(long, env = "SWEEP_INTERVAL_SECS", default_value = "30")]
	pub sweep_interval_secs: u64,

	/// Translation cache TTL in seconds
	#[arg(long, env = "CACHE_TTL_SECS", default_value = "3600")]
	pub cache_ttl_secs: u64,

	/// Translation cache capacity in entries
	#[arg(long, env = "CACHE_CAPACITY", default_value = "4096")]
	pub cache_capacity: usize,

	/// Service name for logs
	#[arg(long, env = "SERVICE_NAME", default_value = "chat-translator")]
	pub service_name: String,
}

impl Config {
	/// Validate configuration values
	pub fn validate(&self) -> Result<(), String> {
		if self.workers_min == 0 {
			return Err("workers_min must be at least 1".to_string());
		}

		if self.workers_min > self.workers_max {
			return Err("workers_min must not exceed workers_max".to_string());
		}

		if !(self.workers_min..=self.workers_max).contains(&self.workers_default) {
			return Err("workers_default must lie between workers_min and workers_max".to_string());
		}

		if self.queue_capacity == 0 {
			return Err("queue_capacity must be greater than 0".to_string());
		}

		if self.batch_max_size == 0 {
			return Err("batch_max_size must be greater than 0".to_string());
		}

		if self.wait_timeout_secs == 0 {
			return Err("wait_timeout_secs must be greater than 0".to_string());
		}

		if self.poll_interval_ms == 0 {
			return Err("poll_interval_ms must be greater than 0".to_string());
		}

		if self.result_retention_secs == 0 {
			return Err("result_retention_secs must be greater than 0".to_string());
		}

		Ok(())
	}
}

use super::error::ActuatorError;
use super::state_machine::MuteAction;
use log::debug;
use reqwest::blocking::Client;
use std::cell::{Cell, RefCell};
use std::time::Duration;

pub trait Actuator {
    /// One outbound call. Errors leave the caller's state untouched.
    fn call(&self, action: MuteAction) -> Result<(), ActuatorError>;
}

/// 通过 HTTP GET 调用外部 webhook 完成静音/取消静音
pub struct WebhookActuator {
    client: Client,
    mute_url: String,
    unmute_url: String,
}

impl WebhookActuator {
    /// `unmute_url` falls back to `mute_url`.
    pub fn new(
        mute_url: &str,
        unmute_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ActuatorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ActuatorError::Client(e.to_string()))?;

        Ok(Self {
            client,
            mute_url: mute_url.to_string(),
            unmute_url: unmute_url.unwrap_or(mute_url).to_string(),
        })
    }

    fn url_for(&self, action: MuteAction) -> &str {
        match action {
            MuteAction::Mute => &self.mute_url,
            MuteAction::Unmute => &self.unmute_url,
        }
    }
}

impl Actuator for WebhookActuator {
    fn call(&self, action: MuteAction) -> Result<(), ActuatorError> {
        // URL 含密钥，不写日志
        let response = self
            .client
            .get(self.url_for(action))
            .send()
            .map_err(|e| ActuatorError::Request(e.without_url()))?;
        let status = response.status();
        debug!("{} webhook responded with {}", action, status);

        if !status.is_success() {
            return Err(ActuatorError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// 测试用：记录每次调用，可预设前 N 次失败
pub struct MockActuator {
    calls: RefCell<Vec<MuteAction>>,
    failures_left: Cell<u32>,
}

impl MockActuator {
    pub fn new() -> Self {
        Self::failing(0)
    }

    pub fn failing(times: u32) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            failures_left: Cell::new(times),
        }
    }

    pub fn fail_next(&self, times: u32) {
        self.failures_left.set(times);
    }

    pub fn calls(&self) -> Vec<MuteAction> {
        self.calls.borrow().clone()
    }
}

impl Default for MockActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl Actuator for MockActuator {
    fn call(&self, action: MuteAction) -> Result<(), ActuatorError> {
        self.calls.borrow_mut().push(action);
        let left = self.failures_left.get();
        if left > 0 {
            self.failures_left.set(left - 1);
            return Err(ActuatorError::Status(503));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// 本地 HTTP 桩：依次响应 `count` 个请求，返回收到的请求行
    fn spawn_stub(status_line: &'static str, count: usize) -> (String, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let mut request_lines = Vec::new();
            for stream in listener.incoming().take(count) {
                let mut stream = stream.unwrap();
                let mut buf = [0u8; 4096];
                let n = stream.read(&mut buf).unwrap();
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                request_lines.push(request.lines().next().unwrap_or_default().to_string());

                let response = format!(
                    "{}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status_line
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
            request_lines
        });

        (format!("http://{}", addr), handle)
    }

    #[test]
    fn test_webhook_success() {
        let (base, server) = spawn_stub("HTTP/1.1 200 OK", 2);
        let actuator = WebhookActuator::new(
            &format!("{}/mute", base),
            Some(&format!("{}/unmute", base)),
            Duration::from_secs(5),
        )
        .unwrap();

        assert!(actuator.call(MuteAction::Mute).is_ok());
        assert!(actuator.call(MuteAction::Unmute).is_ok());

        let lines = server.join().unwrap();
        assert_eq!(lines, vec!["GET /mute HTTP/1.1", "GET /unmute HTTP/1.1"]);
    }

    #[test]
    fn test_unmute_defaults_to_mute_url() {
        let (base, server) = spawn_stub("HTTP/1.1 200 OK", 1);
        let actuator =
            WebhookActuator::new(&format!("{}/hook", base), None, Duration::from_secs(5)).unwrap();

        assert!(actuator.call(MuteAction::Unmute).is_ok());
        assert_eq!(server.join().unwrap(), vec!["GET /hook HTTP/1.1"]);
    }

    #[test]
    fn test_error_status_is_failure() {
        let (base, server) = spawn_stub("HTTP/1.1 500 Internal Server Error", 1);
        let actuator = WebhookActuator::new(&base, None, Duration::from_secs(5)).unwrap();

        let result = actuator.call(MuteAction::Mute);
        assert!(matches!(result, Err(ActuatorError::Status(500))));
        server.join().unwrap();
    }

    #[test]
    fn test_connection_refused_is_failure() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let actuator = WebhookActuator::new(
            &format!("http://127.0.0.1:{}/mute", port),
            None,
            Duration::from_secs(2),
        )
        .unwrap();

        match actuator.call(MuteAction::Mute) {
            Err(ActuatorError::Request(e)) => {
                assert!(e.url().is_none());
                assert!(!e.to_string().contains("127.0.0.1"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_timeout_is_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            if let Ok((_stream, _)) = listener.accept() {
                thread::sleep(Duration::from_millis(1500));
            }
        });

        let actuator = WebhookActuator::new(
            &format!("http://{}/mute", addr),
            None,
            Duration::from_millis(200),
        )
        .unwrap();

        let started = std::time::Instant::now();
        assert!(matches!(
            actuator.call(MuteAction::Mute),
            Err(ActuatorError::Request(_))
        ));
        assert!(started.elapsed() < Duration::from_millis(1500));
        server.join().unwrap();
    }

    #[test]
    fn test_mock_actuator_failures() {
        let actuator = MockActuator::failing(1);
        assert!(actuator.call(MuteAction::Mute).is_err());
        assert!(actuator.call(MuteAction::Mute).is_ok());
        assert_eq!(actuator.calls(), vec![MuteAction::Mute, MuteAction::Mute]);
    }
}

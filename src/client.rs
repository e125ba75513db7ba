use std::env;

use cookie::{Cookie, CookieJar};
use reqwest::blocking::{Client, ClientBuilder, Response};
use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::{Method, Proxy, StatusCode};
use url::Url;

use crate::error::{Error, Result};

const MAX_REDIRECTS: usize = 10;

/// A fetched page: the URL the request finally resolved to after
/// following redirects, and the body of that last response.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub body: String,
}

/// Stateful HTTP access used by the login flow. Every call shares the
/// cookies collected by the previous ones.
pub trait HttpSession {
    fn get(&mut self, url: &str) -> Result<Page>;
    fn post(&mut self, url: &str, form: &[(String, String)]) -> Result<Page>;
}

pub fn get_proxied_client_builder() -> Result<ClientBuilder> {
    let mut cb = ClientBuilder::new();

    trace!("get_proxied_client_builder.http_proxy.before_check");
    if let Ok(http_proxy) = env::var("http_proxy") {
        trace!("get_proxied_client_builder.http_proxy={}", http_proxy);
        cb = cb.proxy(Proxy::http(&http_proxy)?);
    }

    trace!("get_proxied_client_builder.https_proxy.before_check");
    if let Ok(https_proxy) = env::var("https_proxy") {
        trace!("get_proxied_client_builder.https_proxy={}", https_proxy);
        cb = cb.proxy(Proxy::https(&https_proxy)?);
    }

    trace!("get_proxied_client_builder.done");
    Ok(cb)
}

/// Blocking session against the identity provider. Redirects are followed
/// by hand so that cookies set on intermediate hops end up in the jar.
pub struct Session {
    client: Client,
    cookie_jar: CookieJar,
}

impl Session {
    pub fn new(insecure: bool) -> Result<Self> {
        let mut builder = get_proxied_client_builder()?;

        if insecure {
            warn!("TLS certificate verification is DISABLED for the identity provider connection");
            builder = builder.danger_accept_invalid_certs(true);
        }

        Session::from_builder(builder)
    }

    fn from_builder(builder: ClientBuilder) -> Result<Self> {
        Ok(Session {
            client: builder.redirect(Policy::none()).build()?,
            cookie_jar: CookieJar::new(),
        })
    }

    /// The `Cookie` header for `url`, or `None` if no stored cookie applies.
    fn cookie_header(&self, url: &Url) -> Option<String> {
        let cookies = self
            .cookie_jar
            .iter()
            .filter(|cookie_from_jar| cookie_matches(cookie_from_jar, url))
            .map(|cookie_from_jar| format!("{}={}", cookie_from_jar.name(), cookie_from_jar.value()))
            .collect::<Vec<String>>();

        if cookies.is_empty() {
            None
        } else {
            Some(cookies.join("; "))
        }
    }

    fn store_cookies(&mut self, url: &Url, res: &Response) {
        for raw_cookie in res.headers().get_all(SET_COOKIE) {
            let raw_cookie = match raw_cookie.to_str() {
                Ok(c) => c,
                Err(_) => continue,
            };

            let mut cookie = match Cookie::parse(raw_cookie.to_owned()) {
                Ok(c) => c,
                Err(e) => {
                    debug!("store_cookies.unparsable_cookie: {}", e);
                    continue;
                }
            };
            trace!("store_cookies.name={}", cookie.name());

            if cookie.domain().is_none() {
                if let Some(host) = url.host_str() {
                    cookie.set_domain(host.to_owned());
                }
            }

            if cookie.max_age().map_or(false, |age| age.is_zero() || age.is_negative()) {
                self.cookie_jar.remove(Cookie::from(cookie.name().to_owned()));
            } else {
                self.cookie_jar.add(cookie);
            }
        }
    }

    fn send(&mut self, method: Method, url: &str, form: Option<&[(String, String)]>) -> Result<Page> {
        let mut current = Url::parse(url)
            .map_err(|e| Error::network(&format!("invalid url {}: {}", url, e)))?;
        let mut method = method;
        let mut form = form;

        for hop in 0..=MAX_REDIRECTS {
            debug!("{} {}", method, current);

            let mut req = self.client.request(method.clone(), current.clone());
            if let Some(cookies) = self.cookie_header(&current) {
                req = req.header(COOKIE, cookies);
            }
            if let Some(params) = form {
                req = req.form(params);
            }

            let res = req.send().map_err(|e| {
                error!("send: {:?}", e);
                Error::network(&e.to_string())
            })?;
            self.store_cookies(&current, &res);

            let status = res.status();
            if !status.is_redirection() {
                if !status.is_success() {
                    warn!("{} {} answered with {}", method, current, status);
                }

                let body = res.text()?;
                trace!("send.ok hops={} bytes={}", hop, body.len());

                return Ok(Page {
                    url: current.to_string(),
                    body,
                });
            }

            let location = res
                .headers()
                .get(LOCATION)
                .and_then(|l| l.to_str().ok())
                .ok_or_else(|| Error::network(&format!("redirect from {} without a location", current)))?;

            current = resolve_redirect(&current, location)?;
            if !redirect_keeps_body(status, &method) {
                method = Method::GET;
                form = None;
            }
        }

        Err(Error::network(&format!(
            "too many redirects (more than {}) starting at {}",
            MAX_REDIRECTS, url
        )))
    }
}

/// Domain and path matching for a stored cookie. Cookies without a domain
/// attribute were pinned to their origin host when stored.
fn cookie_matches(cookie: &Cookie, url: &Url) -> bool {
    let host = match url.host_str() {
        Some(host) => host.to_ascii_lowercase(),
        None => return false,
    };

    let domain_ok = match cookie.domain() {
        Some(domain) => {
            let domain = domain.to_ascii_lowercase();
            host == domain || host.ends_with(&format!(".{}", domain))
        }
        None => true,
    };
    let path_ok = cookie.path().map_or(true, |path| url.path().starts_with(path));

    domain_ok && path_ok
}

impl HttpSession for Session {
    fn get(&mut self, url: &str) -> Result<Page> {
        self.send(Method::GET, url, None)
    }

    fn post(&mut self, url: &str, form: &[(String, String)]) -> Result<Page> {
        self.send(Method::POST, url, Some(form))
    }
}

fn resolve_redirect(current: &Url, location: &str) -> Result<Url> {
    current
        .join(location)
        .map_err(|e| Error::network(&format!("invalid redirect location {}: {}", location, e)))
}

/// 307 and 308 replay the request as is. Everything else becomes a plain GET,
/// which is what browsers do after a form POST.
fn redirect_keeps_body(status: StatusCode, method: &Method) -> bool {
    match status {
        StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT => true,
        _ => *method == Method::GET,
    }
}

#[cfg(test)]
mod test {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_resolve_relative_redirect() {
        let current = Url::parse("https://idp.example.com/adfs/ls/idpinitiatedsignon.aspx?x=1").unwrap();

        let next = resolve_redirect(&current, "/adfs/ls/?SAMLRequest=abc").unwrap();
        assert_eq!(next.as_str(), "https://idp.example.com/adfs/ls/?SAMLRequest=abc");

        let next = resolve_redirect(&current, "login.aspx").unwrap();
        assert_eq!(next.as_str(), "https://idp.example.com/adfs/ls/login.aspx");
    }

    #[test]
    fn test_resolve_absolute_redirect() {
        let current = Url::parse("https://idp.example.com/start").unwrap();

        let next = resolve_redirect(&current, "https://signin.aws.amazon.com/saml").unwrap();
        assert_eq!(next.as_str(), "https://signin.aws.amazon.com/saml");
    }

    #[test]
    fn test_redirect_method_rewrite() {
        assert!(!redirect_keeps_body(StatusCode::FOUND, &Method::POST));
        assert!(!redirect_keeps_body(StatusCode::SEE_OTHER, &Method::POST));
        assert!(redirect_keeps_body(StatusCode::TEMPORARY_REDIRECT, &Method::POST));
        assert!(redirect_keeps_body(StatusCode::PERMANENT_REDIRECT, &Method::POST));
        assert!(redirect_keeps_body(StatusCode::FOUND, &Method::GET));
    }

    #[test]
    fn test_cookie_matches_domain_and_path() {
        let url = Url::parse("https://sts.idp.example.com/adfs/ls/").unwrap();

        assert!(cookie_matches(&Cookie::parse("a=1; Domain=idp.example.com").unwrap(), &url));
        assert!(cookie_matches(&Cookie::parse("a=1; Domain=.idp.example.com").unwrap(), &url));
        assert!(cookie_matches(&Cookie::parse("a=1; Domain=sts.idp.example.com; Path=/adfs").unwrap(), &url));
        assert!(!cookie_matches(&Cookie::parse("a=1; Domain=example.org").unwrap(), &url));
        assert!(!cookie_matches(&Cookie::parse("a=1; Domain=ample.com").unwrap(), &url));
        assert!(!cookie_matches(&Cookie::parse("a=1; Domain=idp.example.com; Path=/other").unwrap(), &url));
    }

    /// Serves the canned `responses` one connection each and hands back the
    /// raw requests it received.
    fn serve(responses: Vec<&'static str>) -> (String, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let mut requests = vec![];
            for response in responses {
                let (mut stream, _) = listener.accept().unwrap();
                requests.push(read_request(&mut stream));
                stream.write_all(response.as_bytes()).unwrap();
            }
            requests
        });

        (base, handle)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = vec![];
        let mut chunk = [0u8; 1024];

        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().to_owned()))
                    .next()
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(0);

                if buf.len() >= end + 4 + length {
                    return text;
                }
            }
        }

        String::from_utf8_lossy(&buf).to_string()
    }

    fn local_session() -> Session {
        Session::from_builder(Client::builder().no_proxy()).unwrap()
    }

    const REDIRECT_WITH_COOKIES: &str = "HTTP/1.1 302 Found\r\nLocation: /adfs/ls/next\r\nSet-Cookie: MSISAuth=abc; Path=/\r\nSet-Cookie: Tracker=1; Domain=tracker.example.org\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
    const LOOP: &str = "HTTP/1.1 302 Found\r\nLocation: /loop\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
    const NO_LOCATION: &str = "HTTP/1.1 302 Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
    const OK: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 13\r\nConnection: close\r\n\r\n<html></html>";

    #[test]
    fn test_post_redirect_keeps_cookies_and_becomes_get() {
        let (base, server) = serve(vec![REDIRECT_WITH_COOKIES, OK]);
        let mut session = local_session();

        let page = session
            .post(
                &format!("{}/adfs/ls/start", base),
                &[("UserName".to_owned(), "adm".to_owned())],
            )
            .unwrap();

        assert_eq!(page.url, format!("{}/adfs/ls/next", base));
        assert_eq!(page.body, "<html></html>");

        let requests = server.join().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("POST /adfs/ls/start "));
        assert!(requests[0].ends_with("UserName=adm"));

        let follow_up = requests[1].to_ascii_lowercase();
        assert!(follow_up.starts_with("get /adfs/ls/next "));
        assert!(follow_up.contains("cookie: msisauth=abc\r\n"));
        assert!(!follow_up.contains("tracker"));
        assert!(!follow_up.contains("username=adm"));
    }

    #[test]
    fn test_redirect_loop_is_a_network_error() {
        let (base, server) = serve(vec![LOOP; MAX_REDIRECTS + 1]);
        let mut session = local_session();

        let err = session.get(&format!("{}/loop", base)).unwrap_err();

        assert_eq!(err.kind, ErrorKind::Network);
        assert_eq!(server.join().unwrap().len(), MAX_REDIRECTS + 1);
    }

    #[test]
    fn test_redirect_without_location_is_a_network_error() {
        let (base, server) = serve(vec![NO_LOCATION]);
        let mut session = local_session();

        let err = session.get(&format!("{}/start", base)).unwrap_err();

        assert_eq!(err.kind, ErrorKind::Network);
        server.join().unwrap();
    }
}

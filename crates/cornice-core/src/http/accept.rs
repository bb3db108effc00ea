//! Accept header parsing and negotiation

/// One media range of an Accept header, e.g. `text/*;q=0.5`
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
	pub type_: String,
	pub subtype: String,
	pub quality: f32,
}

impl MediaRange {
	/// Parses a single media range, returning `None` for malformed input
	///
	/// # Examples
	///
	/// ```
	/// use cornice_core::http::MediaRange;
	///
	/// let range = MediaRange::parse("text/html; q=0.7").unwrap();
	/// assert_eq!(range.type_, "text");
	/// assert_eq!(range.subtype, "html");
	/// assert_eq!(range.quality, 0.7);
	/// assert!(MediaRange::parse("garbage").is_none());
	/// ```
	pub fn parse(s: &str) -> Option<Self> {
		let mut parts = s.split(';');
		let (type_, subtype) = parts.next()?.trim().split_once('/')?;
		if type_.is_empty() || subtype.is_empty() {
			return None;
		}

		let mut quality = 1.0;
		for param in parts {
			match param.trim().split_once('=') {
				Some((key, value)) if key.trim() == "q" => {
					quality = value.trim().parse().ok()?;
				}
				_ => {}
			}
		}

		Some(Self {
			type_: type_.to_ascii_lowercase(),
			subtype: subtype.to_ascii_lowercase(),
			quality,
		})
	}

	/// Whether this range accepts the concrete media type `offer`
	pub fn matches(&self, offer: &str) -> bool {
		let Some((type_, subtype)) = offer.split_once('/') else {
			return false;
		};
		(self.type_ == "*" || self.type_.eq_ignore_ascii_case(type_))
			&& (self.subtype == "*" || self.subtype.eq_ignore_ascii_case(subtype))
	}

	fn wildcards(&self) -> usize {
		usize::from(self.type_ == "*") + usize::from(self.subtype == "*")
	}
}

/// A parsed Accept header
///
/// A request without an Accept header is represented by [`AcceptHeader::any`],
/// which accepts every offer and prefers the first one.
#[derive(Debug, Clone)]
pub struct AcceptHeader {
	ranges: Option<Vec<MediaRange>>,
}

impl AcceptHeader {
	/// Parses an Accept header value; ranges with `q=0` are dropped
	pub fn parse(header: &str) -> Self {
		let ranges = header
			.split(',')
			.filter_map(|s| MediaRange::parse(s.trim()))
			.filter(|r| r.quality > 0.0)
			.collect();
		Self {
			ranges: Some(ranges),
		}
	}

	/// The header of a request that sent no Accept header
	pub fn any() -> Self {
		Self { ranges: None }
	}

	/// Whether the request sent an Accept header at all
	pub fn is_present(&self) -> bool {
		self.ranges.is_some()
	}

	/// Whether `offer` is acceptable
	///
	/// # Examples
	///
	/// ```
	/// use cornice_core::http::AcceptHeader;
	///
	/// let accept = AcceptHeader::parse("text/*, application/json;q=0");
	/// assert!(accept.contains("text/html"));
	/// assert!(!accept.contains("application/json"));
	/// assert!(AcceptHeader::any().contains("application/json"));
	/// ```
	pub fn contains(&self, offer: &str) -> bool {
		match &self.ranges {
			None => true,
			Some(ranges) => ranges.iter().any(|r| r.matches(offer)),
		}
	}

	/// Picks the offer the client prefers
	///
	/// Higher client quality wins; at equal quality a more specific range wins
	/// and after that the earlier offer.
	///
	/// # Examples
	///
	/// ```
	/// use cornice_core::http::AcceptHeader;
	///
	/// let accept = AcceptHeader::parse("text/html;q=0.5, application/json");
	/// let offers = ["text/html", "application/json"];
	/// assert_eq!(accept.best_match(&offers), Some("application/json"));
	///
	/// let accept = AcceptHeader::parse("image/png");
	/// assert_eq!(accept.best_match(&offers), None);
	/// ```
	pub fn best_match<'a, S: AsRef<str>>(&self, offers: &'a [S]) -> Option<&'a str> {
		let Some(ranges) = &self.ranges else {
			return offers.first().map(AsRef::as_ref);
		};

		let mut best: Option<(&'a str, f32, usize)> = None;
		for offer in offers {
			let offer = offer.as_ref();
			for range in ranges {
				if !range.matches(offer) {
					continue;
				}
				let better = match best {
					None => true,
					Some((_, quality, wildcards)) => {
						range.quality > quality
							|| (range.quality == quality && range.wildcards() < wildcards)
					}
				};
				if better {
					best = Some((offer, range.quality, range.wildcards()));
				}
			}
		}
		best.map(|(offer, _, _)| offer)
	}
}

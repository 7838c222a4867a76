use num::ToPrimitive as _;
use std::io::Write;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error("unexpected end of input at offset {0}")]
	UnexpectedEof(usize),

	#[error(transparent)]
	Utf8(#[from] std::str::Utf8Error),

	#[error("length {length} exceeds the maximum of {max}")]
	TooLong { length: usize, max: usize },

	#[error("{0}")]
	Custom(String),
}

pub trait ToXdr {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), Error>
	where
		W: Write;
}

pub trait FromXdr: Sized {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error>;
}

pub struct Encoder<W> {
	output: W,
	position: usize,
}

pub struct Decoder<'a> {
	input: &'a [u8],
	position: usize,
}

const PADDING: [u8; 4] = [0; 4];

#[must_use]
pub fn padding(length: usize) -> usize {
	(4 - length % 4) % 4
}

impl<W> Encoder<W>
where
	W: Write,
{
	pub fn new(output: W) -> Self {
		Self {
			output,
			position: 0,
		}
	}

	/// The number of bytes written so far.
	pub fn position(&self) -> usize {
		self.position
	}

	pub fn into_inner(self) -> W {
		self.output
	}

	pub fn encode<T>(&mut self, value: &T) -> Result<(), Error>
	where
		T: ToXdr + ?Sized,
	{
		value.encode(self)
	}

	fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
		self.output.write_all(bytes)?;
		self.position += bytes.len();
		Ok(())
	}

	pub fn encode_int(&mut self, value: i32) -> Result<(), Error> {
		self.write(&value.to_be_bytes())
	}

	pub fn encode_uint(&mut self, value: u32) -> Result<(), Error> {
		self.write(&value.to_be_bytes())
	}

	pub fn encode_hyper(&mut self, value: i64) -> Result<(), Error> {
		self.write(&value.to_be_bytes())
	}

	pub fn encode_uhyper(&mut self, value: u64) -> Result<(), Error> {
		self.write(&value.to_be_bytes())
	}

	pub fn encode_bool(&mut self, value: bool) -> Result<(), Error> {
		self.encode_uint(u32::from(value))
	}

	pub fn encode_length(&mut self, length: usize) -> Result<(), Error> {
		let length = length.to_u32().ok_or(Error::TooLong {
			length,
			max: u32::MAX as usize,
		})?;
		self.encode_uint(length)
	}

	/// Encode fixed-length opaque data, padded to a multiple of four bytes.
	pub fn encode_opaque_fixed(&mut self, bytes: &[u8]) -> Result<(), Error> {
		self.write(bytes)?;
		self.write(&PADDING[..padding(bytes.len())])
	}

	/// Encode variable-length opaque data with its length prefix.
	pub fn encode_opaque(&mut self, bytes: &[u8]) -> Result<(), Error> {
		self.encode_length(bytes.len())?;
		self.encode_opaque_fixed(bytes)
	}

	pub fn encode_str(&mut self, value: &str) -> Result<(), Error> {
		self.encode_opaque(value.as_bytes())
	}
}

impl<'a> Decoder<'a> {
	#[must_use]
	pub fn from_bytes(input: &'a [u8]) -> Self {
		Self { input, position: 0 }
	}

	pub fn decode<T>(&mut self) -> Result<T, Error>
	where
		T: FromXdr,
	{
		T::decode(self)
	}

	/// Decode a fixed number of elements.
	pub fn decode_n<T, const N: usize>(&mut self) -> Result<[T; N], Error>
	where
		T: FromXdr + Default + Copy,
	{
		let mut values = [T::default(); N];
		for value in &mut values {
			*value = self.decode()?;
		}
		Ok(values)
	}

	#[must_use]
	pub fn position(&self) -> usize {
		self.position
	}

	#[must_use]
	pub fn remaining(&self) -> usize {
		self.input.len() - self.position
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.remaining() == 0
	}

	fn read(&mut self, length: usize) -> Result<&'a [u8], Error> {
		if self.remaining() < length {
			return Err(Error::UnexpectedEof(self.position));
		}
		let bytes = &self.input[self.position..self.position + length];
		self.position += length;
		Ok(bytes)
	}

	fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
		let mut array = [0; N];
		array.copy_from_slice(self.read(N)?);
		Ok(array)
	}

	/// Skip `length` bytes along with their padding.
	pub fn skip(&mut self, length: usize) -> Result<(), Error> {
		self.read(length + padding(length))?;
		Ok(())
	}

	pub fn decode_int(&mut self) -> Result<i32, Error> {
		Ok(i32::from_be_bytes(self.read_array()?))
	}

	pub fn decode_uint(&mut self) -> Result<u32, Error> {
		Ok(u32::from_be_bytes(self.read_array()?))
	}

	pub fn decode_hyper(&mut self) -> Result<i64, Error> {
		Ok(i64::from_be_bytes(self.read_array()?))
	}

	pub fn decode_uhyper(&mut self) -> Result<u64, Error> {
		Ok(u64::from_be_bytes(self.read_array()?))
	}

	pub fn decode_bool(&mut self) -> Result<bool, Error> {
		match self.decode_uint()? {
			0 => Ok(false),
			1 => Ok(true),
			value => Err(Error::Custom(format!("invalid bool {value}"))),
		}
	}

	pub fn decode_length(&mut self) -> Result<usize, Error> {
		let length = self.decode_uint()?;
		length
			.to_usize()
			.ok_or_else(|| Error::Custom(format!("invalid length {length}")))
	}

	/// Decode fixed-length opaque data and consume its padding.
	pub fn decode_opaque_fixed(&mut self, length: usize) -> Result<&'a [u8], Error> {
		let bytes = self.read(length)?;
		self.read(padding(length))?;
		Ok(bytes)
	}

	/// Decode variable-length opaque data, rejecting lengths above `max`.
	pub fn decode_opaque_max(&mut self, max: usize) -> Result<&'a [u8], Error> {
		let length = self.decode_length()?;
		if length > max {
			return Err(Error::TooLong { length, max });
		}
		self.decode_opaque_fixed(length)
	}

	pub fn decode_opaque(&mut self) -> Result<&'a [u8], Error> {
		self.decode_opaque_max(self.remaining())
	}

	pub fn decode_str(&mut self) -> Result<&'a str, Error> {
		let bytes = self.decode_opaque()?;
		Ok(std::str::from_utf8(bytes)?)
	}
}

impl ToXdr for u32 {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), Error>
	where
		W: Write,
	{
		encoder.encode_uint(*self)
	}
}

impl FromXdr for u32 {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
		decoder.decode_uint()
	}
}

impl ToXdr for i32 {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), Error>
	where
		W: Write,
	{
		encoder.encode_int(*self)
	}
}

impl FromXdr for i32 {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
		decoder.decode_int()
	}
}

impl ToXdr for u64 {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), Error>
	where
		W: Write,
	{
		encoder.encode_uhyper(*self)
	}
}

impl FromXdr for u64 {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
		decoder.decode_uhyper()
	}
}

impl ToXdr for i64 {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), Error>
	where
		W: Write,
	{
		encoder.encode_hyper(*self)
	}
}

impl FromXdr for i64 {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
		decoder.decode_hyper()
	}
}

impl ToXdr for bool {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), Error>
	where
		W: Write,
	{
		encoder.encode_bool(*self)
	}
}

impl FromXdr for bool {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
		decoder.decode_bool()
	}
}

impl ToXdr for str {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), Error>
	where
		W: Write,
	{
		encoder.encode_str(self)
	}
}

impl ToXdr for String {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), Error>
	where
		W: Write,
	{
		encoder.encode_str(self)
	}
}

impl FromXdr for String {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
		decoder.decode_str().map(ToOwned::to_owned)
	}
}

impl<T> ToXdr for [T]
where
	T: ToXdr,
{
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), Error>
	where
		W: Write,
	{
		encoder.encode_length(self.len())?;
		for value in self {
			encoder.encode(value)?;
		}
		Ok(())
	}
}

impl<T> ToXdr for Vec<T>
where
	T: ToXdr,
{
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), Error>
	where
		W: Write,
	{
		encoder.encode(self.as_slice())
	}
}

impl<T> FromXdr for Vec<T>
where
	T: FromXdr,
{
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
		let length = decoder.decode_length()?;

		// Every element occupies at least four bytes.
		if length > decoder.remaining() / 4 {
			return Err(Error::UnexpectedEof(decoder.position()));
		}

		let mut values = Vec::with_capacity(length);
		for _ in 0..length {
			values.push(decoder.decode()?);
		}
		Ok(values)
	}
}

/// Output layer: SUM text files and the JSON record stream.
pub mod stream;
pub mod sum;

pub mod verification_mocks;

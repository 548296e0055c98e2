/****************** Commands *****************/
mod sweep;
